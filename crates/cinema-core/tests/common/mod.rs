//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod fake_media;
pub mod fake_provider;

use std::sync::Arc;

use cinema_core::driver::DriverSettings;
use cinema_core::events::JobEvent;
use cinema_core::retry::RetryPolicy;
use cinema_core::script::{Script, SegmentSpec};
use cinema_core::storage::{ArtifactWriter, GcloudFetcher};
use std::time::Duration;
use tokio::sync::mpsc;

/// `n` resolved segments with distinct prompts.
pub fn specs(n: usize) -> Vec<SegmentSpec> {
    let segments: Vec<String> = (1..=n)
        .map(|i| format!(r#"{{"prompt": "shot {}", "duration": 8}}"#, i))
        .collect();
    let json = format!(
        r#"{{"global_settings": {{"aspect_ratio": "16:9"}}, "segments": [{}]}}"#,
        segments.join(",")
    );
    Script::from_json(&json).unwrap().segment_specs().unwrap()
}

/// Fast timings: 1s polls, 15s backoff step, 10s submit retry, 3 attempts.
pub fn settings() -> DriverSettings {
    DriverSettings {
        poll_interval: Duration::from_secs(1),
        retry: RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_secs(15),
            submit_retry_delay: Duration::from_secs(10),
        },
        deadline: None,
    }
}

/// Writer for inline artifacts; remote URIs are never produced by the fake provider.
pub fn writer() -> Arc<ArtifactWriter> {
    Arc::new(ArtifactWriter::new(Arc::new(GcloudFetcher::default())))
}

pub fn event_channel() -> (mpsc::Sender<JobEvent>, mpsc::Receiver<JobEvent>) {
    mpsc::channel(1024)
}

/// Everything currently buffered in the channel.
pub fn drain(rx: &mut mpsc::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut out = Vec::new();
    while let Ok(e) = rx.try_recv() {
        out.push(e);
    }
    out
}
