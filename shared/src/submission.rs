//! One best-effort send: locate, optionally upload the attachment, write
//! the record. No retries; the first failure ends the submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{MediaUrl, ObjectPath};
use crate::media::{self, Attachment, MediaError, UploadPayload};
use crate::report::{Coordinates, EmergencyReport, PendingReport};
use crate::EMERGENCY_MEDIA_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitStage {
    Locating,
    LoadingMedia,
    UploadingMedia,
    WritingRecord,
}

impl SubmitStage {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Locating => "locating",
            Self::LoadingMedia => "loading_media",
            Self::UploadingMedia => "uploading_media",
            Self::WritingRecord => "writing_record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("event for stage {got:?} arrived during {expected:?}")]
    OutOfOrder {
        expected: SubmitStage,
        got: SubmitStage,
    },
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// What the app has to do next.
#[derive(Debug, PartialEq)]
pub enum NextStep {
    LoadMedia { uri: String },
    Upload {
        path: ObjectPath,
        payload: UploadPayload,
    },
    WriteRecord(Box<EmergencyReport>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    report: PendingReport,
    stage: SubmitStage,
    location: Option<Coordinates>,
    object: Option<ObjectPath>,
    media_url: Option<MediaUrl>,
}

impl Submission {
    #[must_use]
    pub fn begin(report: PendingReport) -> Self {
        Self {
            report,
            stage: SubmitStage::Locating,
            location: None,
            object: None,
            media_url: None,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> SubmitStage {
        self.stage
    }

    /// Object this submission finished uploading, if it got that far.
    #[must_use]
    pub fn uploaded_object(&self) -> Option<&ObjectPath> {
        self.media_url.as_ref().and(self.object.as_ref())
    }

    fn require_stage(&self, stage: SubmitStage) -> Result<(), SubmitError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(SubmitError::OutOfOrder {
                expected: self.stage,
                got: stage,
            })
        }
    }

    pub fn located(
        &mut self,
        location: Coordinates,
        now: DateTime<Utc>,
    ) -> Result<NextStep, SubmitError> {
        self.require_stage(SubmitStage::Locating)?;
        self.location = Some(location);
        match &self.report.attachment {
            Some(Attachment { uri, .. }) => {
                self.stage = SubmitStage::LoadingMedia;
                Ok(NextStep::LoadMedia { uri: uri.clone() })
            }
            None => self.finish(None, now),
        }
    }

    pub fn media_loaded(
        &mut self,
        bytes: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<NextStep, SubmitError> {
        self.require_stage(SubmitStage::LoadingMedia)?;
        let Some(attachment) = &self.report.attachment else {
            return self.finish(None, now);
        };
        let payload = media::prepare_upload(attachment.kind, bytes)?;
        let path = ObjectPath::new(media::object_path(
            EMERGENCY_MEDIA_PREFIX,
            now.timestamp_millis(),
        ));
        self.stage = SubmitStage::UploadingMedia;
        self.object = Some(path.clone());
        Ok(NextStep::Upload { path, payload })
    }

    pub fn media_uploaded(
        &mut self,
        url: MediaUrl,
        now: DateTime<Utc>,
    ) -> Result<NextStep, SubmitError> {
        self.require_stage(SubmitStage::UploadingMedia)?;
        self.media_url = Some(url.clone());
        self.finish(Some(url), now)
    }

    fn finish(
        &mut self,
        media_url: Option<MediaUrl>,
        now: DateTime<Utc>,
    ) -> Result<NextStep, SubmitError> {
        let location = self.location.ok_or(SubmitError::OutOfOrder {
            expected: SubmitStage::Locating,
            got: SubmitStage::WritingRecord,
        })?;
        self.stage = SubmitStage::WritingRecord;
        Ok(NextStep::WriteRecord(Box::new(EmergencyReport::complete(
            self.report.clone(),
            location,
            media_url.map(|url| url.0),
            now,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use crate::report::{EmergencyCategory, ReportDraft};
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    fn pending(attachment: Option<Attachment>) -> PendingReport {
        let mut draft = ReportDraft::default();
        draft.select(EmergencyCategory::Flood);
        if let Some(attachment) = attachment {
            draft.attach(attachment);
        }
        draft.snapshot().unwrap()
    }

    fn here() -> Coordinates {
        Coordinates::new(10.3, 123.9).unwrap()
    }

    #[test]
    fn test_without_media_goes_straight_to_record() {
        let mut submission = Submission::begin(pending(None));
        let next = submission.located(here(), now()).unwrap();
        assert_matches!(next, NextStep::WriteRecord(report) => {
            assert_eq!(report.media_url, None);
            assert_eq!(report.category, EmergencyCategory::Flood);
        });
        assert_eq!(submission.stage(), SubmitStage::WritingRecord);
    }

    #[test]
    fn test_media_flow() {
        let attachment = Attachment::new("file:///clip.mp4", MediaKind::Video);
        let mut submission = Submission::begin(pending(Some(attachment)));

        let next = submission.located(here(), now()).unwrap();
        assert_eq!(
            next,
            NextStep::LoadMedia {
                uri: "file:///clip.mp4".into()
            }
        );

        let next = submission.media_loaded(b"....ftypisom".to_vec(), now()).unwrap();
        let path = assert_matches!(next, NextStep::Upload { path, payload } => {
            assert_eq!(payload.content_type, "video/mp4");
            path
        });
        assert_eq!(path.as_str(), "emergencyMedia/1717230600000");

        let url = MediaUrl::new("https://cdn/clip");
        assert_eq!(submission.uploaded_object(), None);
        let next = submission.media_uploaded(url, now()).unwrap();
        assert_matches!(next, NextStep::WriteRecord(report) => {
            assert!(report.is_video);
            assert_eq!(report.media_url.as_deref(), Some("https://cdn/clip"));
        });
        assert_eq!(submission.uploaded_object(), Some(&path));
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let mut submission = Submission::begin(pending(None));
        assert_matches!(
            submission.media_loaded(vec![1], now()),
            Err(SubmitError::OutOfOrder {
                expected: SubmitStage::Locating,
                ..
            })
        );
    }

    #[test]
    fn test_empty_media_fails() {
        let attachment = Attachment::new("file:///p.jpg", MediaKind::Photo);
        let mut submission = Submission::begin(pending(Some(attachment)));
        submission.located(here(), now()).unwrap();
        assert_eq!(
            submission.media_loaded(vec![], now()),
            Err(SubmitError::Media(MediaError::Empty))
        );
    }
}
