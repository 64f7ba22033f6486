use serde::{Deserialize, Serialize};

use crate::config::Endpoints;
use crate::countdown::{Countdown, Generation};
use crate::event::ObjectPath;
use crate::onboarding::{Onboarding, PersonalProfile, StoredProfile};
use crate::report::ReportDraft;
use crate::settings::Preferences;
use crate::submission::Submission;
use crate::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionDecision {
    #[default]
    Pending,
    Granted,
    Denied,
}

impl PermissionDecision {
    #[must_use]
    pub const fn from_granted(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateStatus {
    Requesting,
    Granted,
    Denied,
}

/// Location and notification permissions, asked once at start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGate {
    pub location: PermissionDecision,
    pub notifications: PermissionDecision,
}

impl PermissionGate {
    #[must_use]
    pub const fn status(&self) -> GateStatus {
        match (self.location, self.notifications) {
            (PermissionDecision::Denied, _) | (_, PermissionDecision::Denied) => {
                GateStatus::Denied
            }
            (PermissionDecision::Granted, PermissionDecision::Granted) => GateStatus::Granted,
            _ => GateStatus::Requesting,
        }
    }
}

/// Which persisted entries have been read back at start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreProgress {
    pub preferences: bool,
    pub profile: bool,
}

impl RestoreProgress {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.preferences && self.profile
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// The single modal alert; a new one replaces whatever is showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Alert {
    Error(AppError),
    Notice(Notice),
}

#[derive(Default, Debug)]
pub struct Model {
    pub endpoints: Option<Endpoints>,
    pub gate: PermissionGate,
    pub restore: RestoreProgress,
    pub preferences: Preferences,
    pub system_dark: bool,

    pub onboarding: Onboarding,
    /// Validated profile waiting for its photo upload to finish.
    pub pending_profile: Option<PersonalProfile>,
    pub profile: Option<StoredProfile>,

    pub draft: ReportDraft,
    pub countdown: Countdown,
    pub generation: Generation,
    pub submission: Option<Submission>,
    /// Uploaded objects whose record write failed. Kept for diagnostics only.
    pub orphaned_media: Vec<ObjectPath>,

    pub settings_open: bool,
    pub alert: Option<Alert>,
}

impl Model {
    #[must_use]
    pub const fn dark_mode(&self) -> bool {
        self.preferences.dark_mode(self.system_dark)
    }

    /// Capture-screen interactions are locked while a countdown runs or a
    /// report is waiting for a response.
    #[must_use]
    pub const fn capture_locked(&self) -> bool {
        self.countdown.is_busy()
    }

    pub fn show_error(&mut self, error: AppError) {
        self.alert = Some(Alert::Error(error));
    }

    pub fn show_notice(&mut self, title: &str, message: &str) {
        self.alert = Some(Alert::Notice(Notice {
            title: title.to_owned(),
            message: message.to_owned(),
        }));
    }

    /// Allocates the generation for a new countdown run.
    pub fn next_generation(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.generation
    }
}
