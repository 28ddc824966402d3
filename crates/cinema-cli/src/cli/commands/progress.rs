//! Prints job events as progress lines while a run is in flight.

use cinema_core::events::JobEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffered events before senders wait on the printer.
const EVENT_BUFFER: usize = 64;

/// Spawn the printer; it ends when every sender is dropped.
pub(crate) fn spawn_printer() -> (mpsc::Sender<JobEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<JobEvent>(EVENT_BUFFER);
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", event.describe());
        }
    });
    (tx, handle)
}
