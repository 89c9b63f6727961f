use crate::config::HTTP_TIMEOUT;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("classassistd/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Human-readable message from an error body.
///
/// The REST layer answers `{"message": ..}`; the auth layer has used
/// `msg`, `error_description` and `error` over time. Anything else falls back
/// to the status line.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(s) = v.get(key).and_then(|m| m.as_str()) {
                let s = s.trim();
                if !s.is_empty() {
                    return s.to_string();
                }
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() && body.len() <= 200 && !body.starts_with('<') {
        return body.to_string();
    }
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

/// Splits a response into its status and body text.
pub fn read_response(resp: Response) -> reqwest::Result<(StatusCode, String)> {
    let status = resp.status();
    let body = resp.text()?;
    Ok((status, body))
}
