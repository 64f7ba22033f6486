use serde::{Deserialize, Serialize};

/// Outcome of an OS permission prompt for location, camera or microphone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    DeniedPermanently,
    Restricted,
    #[default]
    NotDetermined,
}

impl PermissionStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub const fn should_show_settings_prompt(self) -> bool {
        matches!(self, Self::DeniedPermanently | Self::Restricted)
    }
}
