use std::fmt;

use crux_kv::KeyValue;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Session,
    Settings,
}

impl KeyNamespace {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, StoreError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    #[must_use]
    pub const fn namespace(&self) -> KeyNamespace {
        self.namespace
    }

    fn validate_key(key: &str) -> Result<(), StoreError> {
        let reason = if key.trim().is_empty() {
            "key cannot be empty"
        } else if key.len() > MAX_KEY_LENGTH {
            "key too long"
        } else if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            "key cannot look like a path"
        } else if key.chars().any(char::is_control) {
            "key contains control characters"
        } else {
            return Ok(());
        };
        Err(StoreError::InvalidKey {
            key: key.chars().take(50).collect(),
            reason: reason.into(),
        })
    }
}

/// Everything the core persists, one entry per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKey {
    Preferences,
    Profile,
}

impl StoreKey {
    pub const ALL: [Self; 2] = [Self::Preferences, Self::Profile];

    #[must_use]
    pub fn kv_key(self) -> KvKey {
        let (namespace, key) = match self {
            Self::Preferences => (KeyNamespace::Settings, "preferences"),
            Self::Profile => (KeyNamespace::Session, "profile"),
        };
        KvKey {
            namespace,
            key: key.to_owned(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kv_key().raw())
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    payload: ciborium::Value,
}

/// CBOR-encodes `value` inside a versioned envelope.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(
        &EnvelopeRef {
            version: SCHEMA_VERSION,
            payload: value,
        },
        &mut buf,
    )
    .map_err(|e| StoreError::Serialization(e.to_string()))?;

    if buf.len() > MAX_VALUE_SIZE {
        return Err(StoreError::ValueTooLarge {
            size: buf.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(buf)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    let envelope: Envelope =
        ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if envelope.version != SCHEMA_VERSION {
        return Err(StoreError::SchemaVersion {
            found: envelope.version,
            expected: SCHEMA_VERSION,
        });
    }
    envelope
        .payload
        .deserialized()
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Issues a read of `key`; the raw bytes come back through `make_event`.
pub fn load<Ev, F>(kv: &KeyValue<Ev>, key: StoreKey, make_event: F)
where
    Ev: Send + 'static,
    F: FnOnce(StoreKey, Result<Option<Vec<u8>>, StoreError>) -> Ev + Send + Sync + 'static,
{
    kv.get(key.kv_key().raw(), move |result| {
        make_event(key, result.map_err(|e| StoreError::Storage(e.to_string())))
    });
}

pub fn save<Ev, T, F>(kv: &KeyValue<Ev>, key: StoreKey, value: &T, make_event: F) -> Result<(), StoreError>
where
    Ev: Send + 'static,
    T: Serialize,
    F: FnOnce(StoreKey, Result<(), StoreError>) -> Ev + Send + Sync + 'static,
{
    let bytes = encode(value)?;
    kv.set(key.kv_key().raw(), bytes, move |result| {
        make_event(
            key,
            result
                .map(|_| ())
                .map_err(|e| StoreError::Storage(e.to_string())),
        )
    });
    Ok(())
}
