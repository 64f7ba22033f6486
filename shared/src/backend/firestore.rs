//! `personalInfo` documents in the document store's REST dialect, where
//! every field is wrapped in a typed value.

use crux_http::Http;
use serde::{Deserialize, Serialize};

use super::{parse_json, post_json, BackendError};
use crate::config::Endpoints;
use crate::event::{DocumentId, Event};
use crate::onboarding::PersonalProfile;

#[derive(Serialize)]
struct StringValue<'a> {
    #[serde(rename = "stringValue")]
    string_value: &'a str,
}

impl<'a> StringValue<'a> {
    fn new(string_value: &'a str) -> Self {
        Self { string_value }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileFields<'a> {
    firstname: StringValue<'a>,
    lastname: StringValue<'a>,
    email: StringValue<'a>,
    phone_number: StringValue<'a>,
    profile_image_uri: StringValue<'a>,
}

#[derive(Serialize)]
struct ProfileDocument<'a> {
    fields: ProfileFields<'a>,
}

impl<'a> From<&'a PersonalProfile> for ProfileDocument<'a> {
    fn from(profile: &'a PersonalProfile) -> Self {
        Self {
            fields: ProfileFields {
                firstname: StringValue::new(&profile.first_name),
                lastname: StringValue::new(&profile.last_name),
                email: StringValue::new(&profile.email),
                phone_number: StringValue::new(&profile.phone_number),
                profile_image_uri: StringValue::new(
                    profile.profile_image_url.as_deref().unwrap_or_default(),
                ),
            },
        }
    }
}

#[derive(Deserialize)]
struct CreatedDocument {
    name: String,
}

pub fn create_profile(
    http: &Http<Event>,
    endpoints: &Endpoints,
    profile: &PersonalProfile,
) -> Result<(), BackendError> {
    post_json(
        http,
        &endpoints.personal_info_collection()?,
        &ProfileDocument::from(profile),
        parse_created_document,
        Event::ProfileStored,
    )
}

/// The id is the last segment of the full resource name.
pub fn parse_created_document(body: &[u8]) -> Result<DocumentId, BackendError> {
    let document: CreatedDocument = parse_json(body)?;
    document
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(DocumentId::new)
        .ok_or_else(|| BackendError::MalformedResponse("document name has no id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(image: Option<&str>) -> PersonalProfile {
        PersonalProfile {
            first_name: "Ana".into(),
            last_name: "Reyes".into(),
            email: "ana@example.com".into(),
            phone_number: "0917123456".into(),
            profile_image_url: image.map(str::to_owned),
        }
    }

    #[test]
    fn test_document_fields() {
        let json = serde_json::to_value(ProfileDocument::from(&profile(None))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fields": {
                    "firstname": { "stringValue": "Ana" },
                    "lastname": { "stringValue": "Reyes" },
                    "email": { "stringValue": "ana@example.com" },
                    "phoneNumber": { "stringValue": "0917123456" },
                    "profileImageUri": { "stringValue": "" },
                }
            })
        );
    }

    #[test]
    fn test_document_carries_image_url() {
        let json =
            serde_json::to_value(ProfileDocument::from(&profile(Some("https://x/y")))).unwrap();
        assert_eq!(json["fields"]["profileImageUri"]["stringValue"], "https://x/y");
    }

    #[test]
    fn test_document_id_from_name() {
        let body = br#"{"name":"projects/lels-app/databases/(default)/documents/personalInfo/a1B2c3","fields":{}}"#;
        assert_eq!(parse_created_document(body), Ok(DocumentId::new("a1B2c3")));
        assert!(parse_created_document(br#"{"name":"personalInfo/"}"#).is_err());
    }
}
