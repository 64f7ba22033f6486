use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::capabilities::{
    CameraError, CapturedAsset, DevicePermission, LocationError, NotificationsError,
    PermissionState, PermissionStatus, Position, StoreError, StoreKey, TimerOutput,
};
use crate::config::BackendConfig;
use crate::countdown::Generation;
use crate::report::EmergencyCategory;
use crate::validation::ProfileField;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// Key the realtime database generated for an emergency record.
typed_id!(RecordKey);
// Id of a `personalInfo` document.
typed_id!(DocumentId);
// Path of an object in the blob store, e.g. `emergencyMedia/1700000000000`.
typed_id!(ObjectPath);
// Public download URL of an uploaded object.
typed_id!(MediaUrl);

/// What a camera/microphone permission request was made for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureIntent {
    Photo,
    Video,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    Configure(Box<BackendConfig>),
    AppStarted,
    SystemColorSchemeChanged {
        dark: bool,
    },

    // Permission gate
    #[serde(skip)]
    LocationPermissionResolved(Result<PermissionStatus, LocationError>),
    #[serde(skip)]
    NotificationPermissionResolved(Result<PermissionState, NotificationsError>),

    // Local persistence
    #[serde(skip)]
    StoreLoaded {
        key: StoreKey,
        result: Result<Option<Vec<u8>>, StoreError>,
    },
    #[serde(skip)]
    StoreSaved {
        key: StoreKey,
        result: Result<(), StoreError>,
    },

    // Onboarding
    EmailChanged {
        email: String,
    },
    SubmitEmail,
    #[serde(skip)]
    VerificationCodeSent(Result<(), BackendError>),
    CodeCellChanged {
        index: usize,
        value: String,
    },
    SubmitCode,
    #[serde(skip)]
    CodeVerified(Result<(), BackendError>),
    ProfileFieldChanged {
        field: ProfileField,
        value: String,
    },
    PickProfileImage,
    #[serde(skip)]
    ProfileImagePicked(Result<Option<CapturedAsset>, CameraError>),
    ClearProfileImage,
    SubmitProfile,
    #[serde(skip)]
    ProfileImageLoaded(Result<Vec<u8>, CameraError>),
    #[serde(skip)]
    ProfileImageUploaded(Result<MediaUrl, BackendError>),
    #[serde(skip)]
    ProfileStored(Result<DocumentId, BackendError>),
    AcknowledgeAccountCreated,

    // Capture screen
    EmergencyButtonLongPressed,
    CategorySelected {
        category: EmergencyCategory,
    },
    DescriptionChanged {
        text: String,
    },
    CapturePhotoRequested,
    RecordVideoRequested,
    #[serde(skip)]
    DevicePermissionResolved {
        intent: CaptureIntent,
        permission: DevicePermission,
        result: Result<PermissionStatus, CameraError>,
    },
    #[serde(skip)]
    MediaCaptured(Result<Option<CapturedAsset>, CameraError>),
    ClearAttachment,
    HomePressed,

    // Countdown
    SendPressed,
    CancelPressed,
    #[serde(skip)]
    CountdownTick {
        generation: Generation,
        output: TimerOutput,
    },

    // Submission
    #[serde(skip)]
    PositionResolved(Result<Position, LocationError>),
    #[serde(skip)]
    ReportMediaLoaded(Result<Vec<u8>, CameraError>),
    #[serde(skip)]
    ReportMediaUploaded(Result<MediaUrl, BackendError>),
    #[serde(skip)]
    ReportStored(Result<RecordKey, BackendError>),

    // Settings overlay
    OpenSettings,
    CloseSettings,
    ToggleDarkMode,
    EditProfilePressed,

    DismissAlert,
}

impl Event {
    /// Stable snake_case name for logs. Never includes payloads.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::AppStarted => "app_started",
            Self::SystemColorSchemeChanged { .. } => "system_color_scheme_changed",
            Self::LocationPermissionResolved(_) => "location_permission_resolved",
            Self::NotificationPermissionResolved(_) => "notification_permission_resolved",
            Self::StoreLoaded { .. } => "store_loaded",
            Self::StoreSaved { .. } => "store_saved",
            Self::EmailChanged { .. } => "email_changed",
            Self::SubmitEmail => "submit_email",
            Self::VerificationCodeSent(_) => "verification_code_sent",
            Self::CodeCellChanged { .. } => "code_cell_changed",
            Self::SubmitCode => "submit_code",
            Self::CodeVerified(_) => "code_verified",
            Self::ProfileFieldChanged { .. } => "profile_field_changed",
            Self::PickProfileImage => "pick_profile_image",
            Self::ProfileImagePicked(_) => "profile_image_picked",
            Self::ClearProfileImage => "clear_profile_image",
            Self::SubmitProfile => "submit_profile",
            Self::ProfileImageLoaded(_) => "profile_image_loaded",
            Self::ProfileImageUploaded(_) => "profile_image_uploaded",
            Self::ProfileStored(_) => "profile_stored",
            Self::AcknowledgeAccountCreated => "acknowledge_account_created",
            Self::EmergencyButtonLongPressed => "emergency_button_long_pressed",
            Self::CategorySelected { .. } => "category_selected",
            Self::DescriptionChanged { .. } => "description_changed",
            Self::CapturePhotoRequested => "capture_photo_requested",
            Self::RecordVideoRequested => "record_video_requested",
            Self::DevicePermissionResolved { .. } => "device_permission_resolved",
            Self::MediaCaptured(_) => "media_captured",
            Self::ClearAttachment => "clear_attachment",
            Self::HomePressed => "home_pressed",
            Self::SendPressed => "send_pressed",
            Self::CancelPressed => "cancel_pressed",
            Self::CountdownTick { .. } => "countdown_tick",
            Self::PositionResolved(_) => "position_resolved",
            Self::ReportMediaLoaded(_) => "report_media_loaded",
            Self::ReportMediaUploaded(_) => "report_media_uploaded",
            Self::ReportStored(_) => "report_stored",
            Self::OpenSettings => "open_settings",
            Self::CloseSettings => "close_settings",
            Self::ToggleDarkMode => "toggle_dark_mode",
            Self::EditProfilePressed => "edit_profile_pressed",
            Self::DismissAlert => "dismiss_alert",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::EmailChanged { .. }
                | Self::SubmitEmail
                | Self::CodeCellChanged { .. }
                | Self::SubmitCode
                | Self::ProfileFieldChanged { .. }
                | Self::PickProfileImage
                | Self::ClearProfileImage
                | Self::SubmitProfile
                | Self::AcknowledgeAccountCreated
                | Self::EmergencyButtonLongPressed
                | Self::CategorySelected { .. }
                | Self::DescriptionChanged { .. }
                | Self::CapturePhotoRequested
                | Self::RecordVideoRequested
                | Self::ClearAttachment
                | Self::HomePressed
                | Self::SendPressed
                | Self::CancelPressed
                | Self::OpenSettings
                | Self::CloseSettings
                | Self::ToggleDarkMode
                | Self::EditProfilePressed
                | Self::DismissAlert
        )
    }
}
