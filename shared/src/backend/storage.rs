use crux_http::Http;
use serde::Deserialize;

use super::{parse_json, read_response, BackendError};
use crate::config::{storage_download_url, Endpoints};
use crate::event::{Event, MediaUrl, ObjectPath};
use crate::media::UploadPayload;

/// Object metadata returned by a successful upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredObject {
    name: String,
    bucket: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Uploads `payload` to `path`; `make_event` receives the public URL.
pub fn upload<F>(
    http: &Http<Event>,
    endpoints: &Endpoints,
    path: &ObjectPath,
    payload: UploadPayload,
    make_event: F,
) -> Result<(), BackendError>
where
    F: FnOnce(Result<MediaUrl, BackendError>) -> Event + Send + 'static,
{
    let url = endpoints.storage_upload(path.as_str())?;
    let UploadPayload {
        bytes,
        content_type,
    } = payload;
    http.post(url.as_str())
        .body_bytes(bytes)
        .header("Content-Type", content_type)
        .send(move |result| {
            make_event(read_response(result).and_then(|body| download_url(&body)))
        });
    Ok(())
}

/// Builds the token-guarded download URL from the upload response.
pub fn download_url(body: &[u8]) -> Result<MediaUrl, BackendError> {
    let object: StoredObject = parse_json(body)?;
    // Several tokens may be listed, comma-separated; any of them works.
    let token = object
        .download_tokens
        .as_deref()
        .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
        .ok_or_else(|| BackendError::MalformedResponse("upload returned no download token".into()))?;
    let url = storage_download_url(&object.bucket, &object.name, token)?;
    Ok(MediaUrl::new(url.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_from_upload_response() {
        let body = br#"{
            "name": "emergencyMedia/1700000000000",
            "bucket": "lels-app.appspot.com",
            "contentType": "image/jpeg",
            "size": "52311",
            "downloadTokens": "3f1c-aa,9b2e-bb"
        }"#;
        assert_eq!(
            download_url(body).unwrap().as_str(),
            "https://firebasestorage.googleapis.com/v0/b/lels-app.appspot.com/o/\
             emergencyMedia%2F1700000000000?alt=media&token=3f1c-aa"
        );
    }

    #[test]
    fn test_missing_token_is_malformed() {
        let body = br#"{"name":"profileImages/1","bucket":"b.appspot.com"}"#;
        assert!(matches!(
            download_url(body),
            Err(BackendError::MalformedResponse(_))
        ));
    }
}
