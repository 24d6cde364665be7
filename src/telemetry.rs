//! Request lifecycle telemetry
//!
//! Every engine request emits events through a registered channel. The
//! channel is observational only: a missing or closed receiver never affects
//! the request itself.

use tokio::sync::mpsc;

/// How much of a response body is carried in an event
const RESPONSE_PREVIEW_CHARS: usize = 200;

/// One observed step of an engine request
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// HTTP method of the request
    pub method: &'static str,
    /// Full request URL
    pub url: String,
    /// Response status, absent for issued/failed events
    pub status: Option<u16>,
    /// Milliseconds since the request was issued
    pub latency_ms: u64,
    /// Failure description, when the step is an error
    pub error: Option<String>,
    /// Leading characters of the response body
    pub response_preview: Option<String>,
}

impl RequestEvent {
    /// Event for a request about to go on the wire
    pub fn issued(method: &'static str, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            status: None,
            latency_ms: 0,
            error: None,
            response_preview: None,
        }
    }

    /// Event for a response that came back, whatever its status
    pub fn responded(method: &'static str, url: &str, status: u16, latency_ms: u64, body: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            status: Some(status),
            latency_ms,
            error: None,
            response_preview: Some(preview(body)),
        }
    }

    /// Event for a request that failed before producing a response
    pub fn failed(method: &'static str, url: &str, latency_ms: u64, error: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            status: None,
            latency_ms,
            error: Some(error.to_string()),
            response_preview: None,
        }
    }
}

/// Sender half registered with the client
pub type TelemetrySender = mpsc::UnboundedSender<RequestEvent>;

/// Receiver half handed to the observing collaborator
pub type TelemetryReceiver = mpsc::UnboundedReceiver<RequestEvent>;

/// Creates a connected telemetry channel pair
pub fn channel() -> (TelemetrySender, TelemetryReceiver) {
    mpsc::unbounded_channel()
}

fn preview(body: &str) -> String {
    body.chars().take(RESPONSE_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_bounded_and_char_safe() {
        let long = "é".repeat(500);
        let event = RequestEvent::responded("GET", "http://x", 200, 1, &long);
        assert_eq!(
            event.response_preview.unwrap().chars().count(),
            RESPONSE_PREVIEW_CHARS
        );
    }

    #[test]
    fn issued_event_has_no_status() {
        let event = RequestEvent::issued("POST", "http://x/upload");
        assert!(event.status.is_none());
        assert!(event.error.is_none());
    }
}
