//! Backend configuration supplied by the shell at launch.
//!
//! The shell sends a [`BackendConfig`] with `Event::Configure`; the core
//! validates it once into [`Endpoints`], which every network operation
//! builds its URLs from.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const STORAGE_API_BASE: &str = "https://firebasestorage.googleapis.com";
pub const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com";
pub const PERSONAL_INFO_COLLECTION: &str = "personalInfo";
pub const EMERGENCIES_PATH: &str = "emergencies.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("backend is not configured")]
    NotConfigured,
    #[error("{field}: invalid url: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("{field}: unsupported scheme {scheme}")]
    UnsupportedScheme { field: &'static str, scheme: String },
    #[error("{field}: url has no host")]
    MissingHost { field: &'static str },
    #[error("{field}: url must not carry credentials")]
    CredentialsInUrl { field: &'static str },
    #[error("{field}: invalid identifier {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },
}

/// Raw configuration as the shell sends it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub verification_base_url: String,
    pub database_url: String,
    pub storage_bucket: String,
    pub project_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub database_secret: Option<String>,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("verification_base_url", &self.verification_base_url)
            .field("database_url", &self.database_url)
            .field("storage_bucket", &self.storage_bucket)
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("database_secret", &self.database_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl BackendConfig {
    pub fn validate(self) -> Result<Endpoints, ConfigError> {
        let verification = parse_base_url("verification_base_url", &self.verification_base_url)?;
        let database = parse_base_url("database_url", &self.database_url)?;
        validate_identifier("storage_bucket", &self.storage_bucket)?;
        validate_identifier("project_id", &self.project_id)?;

        Ok(Endpoints {
            verification,
            database,
            storage_bucket: self.storage_bucket,
            project_id: self.project_id,
            api_key: self.api_key.filter(|k| !k.is_empty()).map(SecretString::new),
            database_secret: self
                .database_secret
                .filter(|s| !s.is_empty())
                .map(SecretString::new),
        })
    }
}

/// Private hosts are allowed: the verification service usually runs on the
/// local network.
fn parse_base_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme {
            field,
            scheme: url.scheme().to_owned(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingHost { field });
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::CredentialsInUrl { field });
    }

    // `Url::join` replaces the last segment unless the base ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn validate_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field,
            value: value.to_owned(),
        })
    }
}

/// Validated backend locations.
pub struct Endpoints {
    verification: Url,
    database: Url,
    storage_bucket: String,
    project_id: String,
    api_key: Option<SecretString>,
    database_secret: Option<SecretString>,
}

impl fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoints")
            .field("verification", &self.verification.as_str())
            .field("database", &self.database.as_str())
            .field("storage_bucket", &self.storage_bucket)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl Endpoints {
    #[must_use]
    pub fn storage_bucket(&self) -> &str {
        &self.storage_bucket
    }

    pub fn send_verification_code(&self) -> Result<Url, ConfigError> {
        self.join_verification("api/send-verification-code")
    }

    pub fn verify_code(&self) -> Result<Url, ConfigError> {
        self.join_verification("api/verify-code")
    }

    fn join_verification(&self, path: &str) -> Result<Url, ConfigError> {
        self.verification
            .join(path)
            .map_err(|e| ConfigError::InvalidUrl {
                field: "verification_base_url",
                reason: e.to_string(),
            })
    }

    /// `{database}/emergencies.json`; the realtime database assigns the key.
    pub fn emergencies(&self) -> Result<Url, ConfigError> {
        let mut url = self
            .database
            .join(EMERGENCIES_PATH)
            .map_err(|e| ConfigError::InvalidUrl {
                field: "database_url",
                reason: e.to_string(),
            })?;
        if let Some(secret) = &self.database_secret {
            url.query_pairs_mut()
                .append_pair("auth", secret.expose_secret());
        }
        Ok(url)
    }

    /// Simple media upload of one object.
    pub fn storage_upload(&self, object_path: &str) -> Result<Url, ConfigError> {
        let mut url = storage_object_base(&self.storage_bucket, None)?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object_path);
        Ok(url)
    }

    pub fn personal_info_collection(&self) -> Result<Url, ConfigError> {
        let mut url = parse_api_base(FIRESTORE_API_BASE)?;
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidUrl {
                field: "project_id",
                reason: "cannot be a base".into(),
            })?
            .clear()
            .extend(&[
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                PERSONAL_INFO_COLLECTION,
            ]);
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key.expose_secret());
        }
        Ok(url)
    }
}

/// Public, token-guarded URL of an uploaded object.
pub fn storage_download_url(bucket: &str, object_name: &str, token: &str) -> Result<Url, ConfigError> {
    let mut url = storage_object_base(bucket, Some(object_name))?;
    url.query_pairs_mut()
        .append_pair("alt", "media")
        .append_pair("token", token);
    Ok(url)
}

// Object names go in a single path segment, so '/' is percent-encoded.
fn storage_object_base(bucket: &str, object_name: Option<&str>) -> Result<Url, ConfigError> {
    let mut url = parse_api_base(STORAGE_API_BASE)?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| ConfigError::InvalidUrl {
            field: "storage_bucket",
            reason: "cannot be a base".into(),
        })?;
        segments.clear().extend(&["v0", "b", bucket, "o"]);
        if let Some(name) = object_name {
            segments.push(name);
        }
    }
    Ok(url)
}

fn parse_api_base(base: &'static str) -> Result<Url, ConfigError> {
    Url::parse(base).map_err(|e| ConfigError::InvalidUrl {
        field: "api_base",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BackendConfig {
        BackendConfig {
            verification_base_url: "http://192.168.1.105:8000".into(),
            database_url: "https://lels-default-rtdb.firebaseio.com/".into(),
            storage_bucket: "lels-app.appspot.com".into(),
            project_id: "lels-app".into(),
            api_key: Some("AIzaTest".into()),
            database_secret: None,
        }
    }

    #[test]
    fn test_verification_urls() {
        let endpoints = sample().validate().unwrap();
        assert_eq!(
            endpoints.send_verification_code().unwrap().as_str(),
            "http://192.168.1.105:8000/api/send-verification-code"
        );
        assert_eq!(
            endpoints.verify_code().unwrap().as_str(),
            "http://192.168.1.105:8000/api/verify-code"
        );
    }

    #[test]
    fn test_base_path_is_preserved() {
        let mut config = sample();
        config.verification_base_url = "https://api.example.com/lels".into();
        let endpoints = config.validate().unwrap();
        assert_eq!(
            endpoints.verify_code().unwrap().as_str(),
            "https://api.example.com/lels/api/verify-code"
        );
    }

    #[test]
    fn test_emergencies_url() {
        let endpoints = sample().validate().unwrap();
        assert_eq!(
            endpoints.emergencies().unwrap().as_str(),
            "https://lels-default-rtdb.firebaseio.com/emergencies.json"
        );

        let mut config = sample();
        config.database_secret = Some("s3cret".into());
        let endpoints = config.validate().unwrap();
        assert_eq!(
            endpoints.emergencies().unwrap().as_str(),
            "https://lels-default-rtdb.firebaseio.com/emergencies.json?auth=s3cret"
        );
    }

    #[test]
    fn test_storage_urls_encode_object_name() {
        let endpoints = sample().validate().unwrap();
        assert_eq!(
            endpoints.storage_upload("emergencyMedia/1700000000000").unwrap().as_str(),
            "https://firebasestorage.googleapis.com/v0/b/lels-app.appspot.com/o\
             ?uploadType=media&name=emergencyMedia%2F1700000000000"
        );
        assert_eq!(
            storage_download_url("lels-app.appspot.com", "emergencyMedia/1700000000000", "tok-1")
                .unwrap()
                .as_str(),
            "https://firebasestorage.googleapis.com/v0/b/lels-app.appspot.com/o/\
             emergencyMedia%2F1700000000000?alt=media&token=tok-1"
        );
    }

    #[test]
    fn test_personal_info_url() {
        let endpoints = sample().validate().unwrap();
        assert_eq!(
            endpoints.personal_info_collection().unwrap().as_str(),
            "https://firestore.googleapis.com/v1/projects/lels-app/databases/(default)/documents/\
             personalInfo?key=AIzaTest"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        let mut config = sample();
        config.verification_base_url = "ftp://files.example.com".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme { .. })
        ));

        let mut config = sample();
        config.database_url = "https://user:pw@db.example.com".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CredentialsInUrl { .. })
        ));

        let mut config = sample();
        config.database_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        let mut config = sample();
        config.project_id = "lels/../admin".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIdentifier { field: "project_id", .. })
        ));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("AIzaTest"));
    }
}
