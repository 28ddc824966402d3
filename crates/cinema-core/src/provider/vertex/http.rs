//! Blocking JSON POST over libcurl.
//!
//! Runs in the current thread; the provider calls it from `spawn_blocking`.

use std::time::Duration;

use crate::provider::ProviderError;

/// Status and body of a completed HTTP exchange.
#[derive(Debug)]
pub(super) struct HttpResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn transport(e: curl::Error) -> ProviderError {
    ProviderError::Transport(e.to_string())
}

/// POST `body` as JSON with a bearer token and collect the response.
pub(super) fn post_json(
    url: &str,
    token: &str,
    body: &[u8],
    timeout: Duration,
) -> Result<HttpResponse, ProviderError> {
    let mut response = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)
        .map_err(|e| ProviderError::Request(format!("invalid URL {}: {}", url, e)))?;
    easy.post(true).map_err(transport)?;
    easy.post_fields_copy(body).map_err(transport)?;
    easy.follow_location(true).map_err(transport)?;
    easy.connect_timeout(Duration::from_secs(30)).map_err(transport)?;
    easy.timeout(timeout).map_err(transport)?;

    let mut list = curl::easy::List::new();
    list.append(&format!("Authorization: Bearer {}", token.trim()))
        .map_err(transport)?;
    list.append("Content-Type: application/json").map_err(transport)?;
    easy.http_headers(list).map_err(transport)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(transport)?;
        transfer.perform().map_err(transport)?;
    }

    let status = easy.response_code().map_err(transport)?;
    Ok(HttpResponse {
        status,
        body: response,
    })
}
