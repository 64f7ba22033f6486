// lib.rs - shared core of the emergency reporting app

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod backend;
pub mod capabilities;
pub mod config;
pub mod countdown;
pub mod event;
pub mod media;
pub mod model;
pub mod onboarding;
pub mod report;
pub mod settings;
pub mod submission;
pub mod validation;
pub mod view;

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

pub const COUNTDOWN_SECONDS: u8 = 4;
pub const COUNTDOWN_TICK_MS: u64 = 1000;
pub const MAX_VIDEO_SECONDS: u32 = 10;
pub const MAX_PHOTO_BYTES: usize = 20 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;
pub const MAX_DESCRIPTION_BYTES: usize = 4096;
pub const MAX_NAME_BYTES: usize = 256;
pub const VERIFICATION_CODE_LENGTH: usize = 6;
pub const PHONE_NUMBER_DIGITS: usize = 10;
pub const EMERGENCY_MEDIA_PREFIX: &str = "emergencyMedia";
pub const PROFILE_IMAGE_PREFIX: &str = "profileImages";

pub mod messages {
    pub const REQUESTING_PERMISSIONS: &str = "Requesting permissions...";
    pub const PERMISSIONS_REQUIRED: &str = "Permissions are required to use the app.";
    pub const PERMISSION_TITLE: &str = "Permission required";
    pub const LOCATION_PERMISSION: &str =
        "Permission to access location is required to use this app.";
    pub const NOTIFICATION_PERMISSION: &str =
        "Permission to send notifications is required to use this app.";
    pub const CAMERA_PERMISSION: &str = "Permission to access camera is required!";
    pub const MICROPHONE_PERMISSION: &str = "Permission to access microphone is required!";
    pub const MEDIA_CAPTURE_FAILED: &str = "Could not get the photo or video. Please try again.";

    pub const SUCCESS_TITLE: &str = "Success";
    pub const ERROR_TITLE: &str = "Error";
    pub const CODE_SENT: &str = "A verification code has been sent to your email.";
    pub const CODE_SEND_FAILED: &str = "Failed to send verification code.";
    pub const EMAIL_VERIFIED: &str = "Email verified successfully.";
    pub const CODE_VERIFY_FAILED: &str = "Failed to verify the code.";
    pub const INVALID_EMAIL: &str = "Please enter a valid email address.";
    pub const INCOMPLETE_CODE: &str = "Please enter all six digits of the code.";
    pub const INVALID_FORM: &str = "Please fill in all the fields correctly.";
    pub const ACCOUNT_CREATED: &str = "Account successfully created!";
    pub const PROFILE_SAVE_FAILED: &str = "There was an error saving your personal information.";
    pub const REPORT_SEND_FAILED: &str = "There was an error sending your emergency data.";

    pub const WAITING_FOR_RESPONSE: &str = "Waiting for Response";
    pub const EMERGENCY: &str = "Emergency";
    pub const RESPONSE_TEAM_NOTICE: &str = "This message will be sent to your c/mdrrmo response team";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    PermissionDenied,
    Validation,
    Network,
    Location,
    Camera,
    Media,
    Configuration,
    Storage,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Validation => "VALIDATION_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::Camera => "CAMERA_ERROR",
            Self::Media => "MEDIA_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Location | Self::Camera | Self::Storage => {
                ErrorSeverity::Transient
            }
            Self::PermissionDenied | Self::Validation | Self::Media => ErrorSeverity::Permanent,
            Self::Configuration | Self::Internal => ErrorSeverity::Fatal,
        }
    }
}

/// The single error surfaced to the user as a modal alert.
///
/// `message` is what the alert shows. `internal_message` carries the
/// underlying cause for logs and never reaches the view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub title: String,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let title = match kind {
            ErrorKind::PermissionDenied => messages::PERMISSION_TITLE,
            _ => messages::ERROR_TITLE,
        };
        Self {
            kind,
            severity: kind.default_severity(),
            title: title.into(),
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Configuration => {
                "The app is not configured correctly. Please reinstall or contact support.".into()
            }
            ErrorKind::Internal => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " ({internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// Current wall-clock time. All timestamps in the core go through here.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// ISO-8601 with millisecond precision and a `Z` suffix, the format the
/// realtime database records carry.
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_permission_errors_use_permission_title() {
        let err = AppError::permission_denied(messages::LOCATION_PERMISSION);
        assert_eq!(err.title, "Permission required");
        assert_eq!(err.code(), "PERMISSION_DENIED");
        assert_eq!(err.severity, ErrorSeverity::Permanent);
    }

    #[test]
    fn test_network_error_shows_its_message() {
        let err = AppError::new(ErrorKind::Network, messages::REPORT_SEND_FAILED)
            .with_internal("status 503");
        assert_eq!(err.title, "Error");
        assert_eq!(err.user_facing_message(), messages::REPORT_SEND_FAILED);
        assert!(err.to_string().contains("status 503"));
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = AppError::new(ErrorKind::Internal, "serde exploded");
        assert!(!err.user_facing_message().contains("serde"));
    }

    #[test]
    fn test_iso_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(iso_timestamp(at), "2024-03-09T14:05:07.000Z");
    }
}
