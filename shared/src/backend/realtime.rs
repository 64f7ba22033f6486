use crux_http::Http;
use serde::Deserialize;

use super::{parse_json, post_json, BackendError};
use crate::config::Endpoints;
use crate::event::{Event, RecordKey};
use crate::report::EmergencyReport;

/// Body the realtime database returns for a push.
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

pub fn push_report(
    http: &Http<Event>,
    endpoints: &Endpoints,
    report: &EmergencyReport,
) -> Result<(), BackendError> {
    post_json(
        http,
        &endpoints.emergencies()?,
        &report.to_record(),
        parse_push_response,
        Event::ReportStored,
    )
}

pub fn parse_push_response(body: &[u8]) -> Result<RecordKey, BackendError> {
    let response: PushResponse = parse_json(body)?;
    if response.name.is_empty() {
        return Err(BackendError::MalformedResponse("empty record key".into()));
    }
    Ok(RecordKey::new(response.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_response_yields_key() {
        assert_eq!(
            parse_push_response(br#"{"name":"-NqL4b2xY"}"#),
            Ok(RecordKey::new("-NqL4b2xY"))
        );
    }

    #[test]
    fn test_malformed_push_response() {
        assert!(matches!(
            parse_push_response(b"null"),
            Err(BackendError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_push_response(br#"{"name":""}"#),
            Err(BackendError::MalformedResponse(_))
        ));
    }
}
