//! Remote services: the verification API, the realtime database, the blob
//! store and the document store.
//!
//! Requests go out through `crux_http`. Response bodies are handled as raw
//! bytes and parsed here, so every parser can be tested without a shell.

pub mod firestore;
pub mod realtime;
pub mod storage;
pub mod verification;

use crux_http::Http;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ConfigError;
use crate::event::Event;
use crate::media::MediaError;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BackendError {
    #[error("backend is not configured")]
    NotConfigured,

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("could not encode request: {0}")]
    Encode(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl BackendError {
    /// Message the server attached to a rejection, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

impl From<ConfigError> for BackendError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotConfigured => Self::NotConfigured,
            other => Self::Endpoint(other.to_string()),
        }
    }
}

/// Classifies a finished exchange: 2xx yields the body, anything else a
/// rejection carrying whatever message the server sent.
pub fn check_status(status: u16, body: Vec<u8>) -> Result<Vec<u8>, BackendError> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(BackendError::Rejected {
            status,
            message: error_message(&body),
        })
    }
}

pub fn read_response(
    result: crux_http::Result<crux_http::Response<Vec<u8>>>,
) -> Result<Vec<u8>, BackendError> {
    let mut response = result.map_err(|e| BackendError::Transport(e.to_string()))?;
    let status = u16::from(response.status());
    let body = response.take_body().unwrap_or_default();
    check_status(status, body)
}

/// Pulls a human-readable message out of the error bodies the services use:
/// `{"message": ..}`, `{"error": ".."}` and `{"error": {"message": ..}}`.
#[must_use]
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let message = value
        .get("message")
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .or_else(|| value.get("error"))?;
    message.as_str().map(str::to_owned)
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(body).map_err(|e| BackendError::MalformedResponse(e.to_string()))
}

/// POSTs `body` as JSON and routes the parsed response into `make_event`.
pub(crate) fn post_json<B, T, P, F>(
    http: &Http<Event>,
    url: &Url,
    body: &B,
    parse: P,
    make_event: F,
) -> Result<(), BackendError>
where
    B: Serialize,
    P: FnOnce(&[u8]) -> Result<T, BackendError> + Send + 'static,
    F: FnOnce(Result<T, BackendError>) -> Event + Send + 'static,
{
    let bytes = serde_json::to_vec(body).map_err(|e| BackendError::Encode(e.to_string()))?;
    http.post(url.as_str())
        .body_bytes(bytes)
        .header("Content-Type", "application/json")
        .send(move |result| {
            make_event(read_response(result).and_then(|body| parse(&body)))
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_body_through() {
        assert_eq!(check_status(200, b"ok".to_vec()), Ok(b"ok".to_vec()));
        assert_eq!(check_status(201, vec![]), Ok(vec![]));
    }

    #[test]
    fn test_rejection_keeps_server_message() {
        let err = check_status(400, br#"{"message":"Email already verified"}"#.to_vec())
            .unwrap_err();
        assert_eq!(err.server_message(), Some("Email already verified"));
    }

    #[test]
    fn test_firebase_error_shapes() {
        assert_eq!(
            error_message(br#"{"error":"Permission denied"}"#).as_deref(),
            Some("Permission denied")
        );
        assert_eq!(
            error_message(br#"{"error":{"code":403,"message":"Missing permissions"}}"#)
                .as_deref(),
            Some("Missing permissions")
        );
        assert_eq!(error_message(b"<html>502</html>"), None);
    }

    #[test]
    fn test_blank_message_is_ignored() {
        let err = BackendError::Rejected {
            status: 500,
            message: Some("  ".into()),
        };
        assert_eq!(err.server_message(), None);
        assert_eq!(BackendError::Transport("dns".into()).server_message(), None);
    }
}
