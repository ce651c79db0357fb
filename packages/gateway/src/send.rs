//! Request helpers shared by every gateway operation.
//!
//! All [`crate::HttpGateway`] calls go through [`send_json`], [`send_ack`]
//! or [`send_bytes`] rather than calling `RequestBuilder::send()`
//! directly, so status checking and decode-failure logging happen in one
//! place. Nothing is retried: a failure is reported once and the
//! dashboard decides what to show.

use crate::GatewayError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends a request and parses the response body as JSON.
///
/// # Errors
///
/// Returns [`GatewayError::Http`] if the request or body read fails,
/// [`GatewayError::Status`] on a non-2xx status, and
/// [`GatewayError::Decode`] if the body is not valid JSON.
pub async fn send_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, GatewayError> {
    let response = send_checked(request).await?;
    let url = response.url().to_string();
    let content_type = header(&response, reqwest::header::CONTENT_TYPE);

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             content-type: {content_type:?}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {}",
            text.len(),
            preview(&text),
        );
        GatewayError::Decode {
            url,
            message: format!("JSON parse failed: {e}"),
        }
    })
}

/// Sends a write request and discards whatever body the backend returns.
///
/// # Errors
///
/// Returns [`GatewayError`] if the request fails or the status is not 2xx.
pub async fn send_ack(request: reqwest::RequestBuilder) -> Result<(), GatewayError> {
    let response = send_checked(request).await?;
    log::debug!("{} acknowledged with {}", response.url(), response.status());
    Ok(())
}

/// Sends a request and returns the raw body with its content type.
///
/// # Errors
///
/// Returns [`GatewayError`] if the request fails, the status is not 2xx,
/// or the body cannot be read.
pub async fn send_bytes(
    request: reqwest::RequestBuilder,
) -> Result<(Option<String>, Vec<u8>), GatewayError> {
    let response = send_checked(request).await?;
    let content_type = header(&response, reqwest::header::CONTENT_TYPE);
    let bytes = response.bytes().await?;
    Ok((content_type, bytes.to_vec()))
}

async fn send_checked(request: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let url = response.url().to_string();
        log::warn!("{url} returned HTTP {status}");
        return Err(GatewayError::Status { url, status });
    }

    Ok(response)
}

fn header(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Truncates `text` to [`BODY_PREVIEW_LEN`] bytes on a char boundary.
pub fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_bodies() {
        assert_eq!(preview("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "م".repeat(400);
        let out = preview(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= BODY_PREVIEW_LEN + 3);
    }
}
