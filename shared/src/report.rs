use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::media::{Attachment, MediaKind};
use crate::validation::Description;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyCategory {
    Flood,
    Fire,
    Medical,
    Others,
}

impl EmergencyCategory {
    pub const ALL: [Self; 4] = [Self::Flood, Self::Fire, Self::Medical, Self::Others];

    /// The exact string written as `emergencyType`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flood => "Flood",
            Self::Fire => "Fire",
            Self::Medical => "Medical",
            Self::Others => "Others",
        }
    }
}

impl fmt::Display for EmergencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown emergency category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for EmergencyCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

// --- Coordinates: validated, NaN-safe ---

#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
#[error("invalid coordinates: latitude={latitude}, longitude={longitude}")]
pub struct InvalidCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl PartialEq for Coordinates {
    fn eq(&self, other: &Self) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

impl Eq for Coordinates {}

// --- Draft: what the capture screen is editing ---

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub options_visible: bool,
    pub category: Option<EmergencyCategory>,
    pub description: Description,
    pub attachment: Option<Attachment>,
}

impl ReportDraft {
    pub fn toggle_options(&mut self) {
        self.options_visible = !self.options_visible;
    }

    pub fn select(&mut self, category: EmergencyCategory) {
        self.category = Some(category);
        self.options_visible = false;
    }

    pub fn set_description(&mut self, text: &str) {
        self.description = Description::truncated(text);
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.category.is_some()
    }

    /// Freezes the draft into the report handed to the submitter.
    #[must_use]
    pub fn snapshot(&self) -> Option<PendingReport> {
        Some(PendingReport {
            id: ReportId::new(),
            category: self.category?,
            description: self.description.as_str().to_owned(),
            attachment: self.attachment.clone(),
        })
    }
}

impl fmt::Debug for ReportDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportDraft")
            .field("options_visible", &self.options_visible)
            .field("category", &self.category)
            .field("description", &"[REDACTED]")
            .field("attachment", &self.attachment)
            .finish()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReportId(pub Uuid);

impl ReportId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A report frozen at countdown expiry, still missing its location and
/// media URL.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingReport {
    pub id: ReportId,
    pub category: EmergencyCategory,
    pub description: String,
    pub attachment: Option<Attachment>,
}

impl fmt::Debug for PendingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReport")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("attachment", &self.attachment)
            .finish_non_exhaustive()
    }
}

/// The write-once report sent to the realtime database.
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyReport {
    pub id: ReportId,
    pub category: EmergencyCategory,
    pub description: String,
    pub media_url: Option<String>,
    pub is_video: bool,
    pub location: Coordinates,
    pub created_at: DateTime<Utc>,
}

impl EmergencyReport {
    #[must_use]
    pub fn complete(
        pending: PendingReport,
        location: Coordinates,
        media_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let is_video = pending
            .attachment
            .as_ref()
            .is_some_and(|attachment| attachment.kind == MediaKind::Video);
        Self {
            id: pending.id,
            category: pending.category,
            description: pending.description,
            media_url,
            is_video,
            location,
            created_at,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> EmergencyRecord {
        EmergencyRecord {
            emergency_type: self.category.as_str().to_owned(),
            description: self.description.clone(),
            media_uri: self.media_url.clone().unwrap_or_default(),
            is_video: self.is_video,
            location: RecordLocation {
                latitude: self.location.latitude(),
                longitude: self.location.longitude(),
            },
            timestamp: crate::iso_timestamp(self.created_at),
        }
    }
}

/// Wire shape of one `emergencies` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRecord {
    pub emergency_type: String,
    pub description: String,
    pub media_uri: String,
    pub is_video: bool,
    pub location: RecordLocation,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_pending(attachment: Option<Attachment>) -> PendingReport {
        let mut draft = ReportDraft::default();
        draft.select(EmergencyCategory::Fire);
        draft.set_description("smoke on 3rd street");
        if let Some(attachment) = attachment {
            draft.attach(attachment);
        }
        draft.snapshot().unwrap()
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in EmergencyCategory::ALL {
            assert_eq!(category.as_str().parse::<EmergencyCategory>(), Ok(category));
        }
        assert!("Earthquake".parse::<EmergencyCategory>().is_err());
    }

    #[test]
    fn test_coordinates_reject_invalid() {
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinates::new(90.5, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(14.5995, 120.9842).is_ok());
    }

    #[test]
    fn test_selecting_hides_options() {
        let mut draft = ReportDraft::default();
        draft.toggle_options();
        assert!(draft.options_visible);
        draft.select(EmergencyCategory::Medical);
        assert!(!draft.options_visible);
        assert_eq!(draft.category, Some(EmergencyCategory::Medical));
    }

    #[test]
    fn test_snapshot_requires_category() {
        assert!(ReportDraft::default().snapshot().is_none());
    }

    #[test]
    fn test_record_wire_shape() {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let location = Coordinates::new(14.6, 121.0).unwrap();
        let report = EmergencyReport::complete(sample_pending(None), location, None, created);
        let json = serde_json::to_value(report.to_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "emergencyType": "Fire",
                "description": "smoke on 3rd street",
                "mediaUri": "",
                "isVideo": false,
                "location": { "latitude": 14.6, "longitude": 121.0 },
                "timestamp": "2024-06-01T08:30:00.000Z",
            })
        );
    }

    #[test]
    fn test_video_flag_follows_attachment() {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let location = Coordinates::new(0.0, 0.0).unwrap();
        let pending = sample_pending(Some(Attachment::new("file:///v.mp4", MediaKind::Video)));
        let report = EmergencyReport::complete(
            pending,
            location,
            Some("https://example.com/v".into()),
            created,
        );
        let record = report.to_record();
        assert!(record.is_video);
        assert_eq!(record.media_uri, "https://example.com/v");
    }

    #[test]
    fn test_draft_debug_redacts_description() {
        let mut draft = ReportDraft::default();
        draft.set_description("my address is 12 Elm");
        assert!(!format!("{draft:?}").contains("Elm"));
    }
}
