use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::permission::PermissionStatus;
use crate::media::{Attachment, MediaKind};
use crate::MAX_VIDEO_SECONDS;

pub const MAX_QUALITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevicePermission {
    Camera,
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const FOUR_BY_THREE: Self = Self {
        width: 4,
        height: 3,
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoConfig {
    pub quality: u8,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            quality: MAX_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoConfig {
    pub quality: u8,
    pub max_duration_secs: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            quality: MAX_QUALITY,
            max_duration_secs: MAX_VIDEO_SECONDS,
        }
    }
}

impl VideoConfig {
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.quality = self.quality.min(MAX_QUALITY);
        self.max_duration_secs = self.max_duration_secs.clamp(1, MAX_VIDEO_SECONDS);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryPickConfig {
    pub kind: MediaKind,
    pub allows_editing: bool,
    pub aspect: Option<AspectRatio>,
    pub quality: u8,
}

impl LibraryPickConfig {
    /// Single editable photo cropped to 4:3, used for profile pictures.
    #[must_use]
    pub fn profile_photo() -> Self {
        Self {
            kind: MediaKind::Photo,
            allows_editing: true,
            aspect: Some(AspectRatio::FOUR_BY_THREE),
            quality: MAX_QUALITY,
        }
    }

    #[must_use]
    pub fn validated(mut self) -> Self {
        self.quality = self.quality.min(MAX_QUALITY);
        if let Some(aspect) = &mut self.aspect {
            aspect.width = aspect.width.max(1);
            aspect.height = aspect.height.max(1);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum CameraOperation {
    RequestPermission { permission: DevicePermission },
    CapturePhoto(PhotoConfig),
    RecordVideo(VideoConfig),
    PickFromLibrary(LibraryPickConfig),
    /// Read the bytes behind a URI previously handed out by the shell.
    LoadAsset { uri: String },
}

/// A file the shell wrote to local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapturedAsset {
    pub uri: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl CapturedAsset {
    #[must_use]
    pub fn into_attachment(self) -> Attachment {
        Attachment::new(self.uri, self.kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum CameraOutput {
    PermissionStatus(PermissionStatus),
    Captured(CapturedAsset),
    Cancelled,
    AssetBytes(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl CameraOutput {
    fn describe(&self) -> &'static str {
        match self {
            Self::PermissionStatus(_) => "permission status",
            Self::Captured(_) => "captured asset",
            Self::Cancelled => "cancellation",
            Self::AssetBytes(_) => "asset bytes",
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraError {
    #[error("{0:?} permission denied")]
    PermissionDenied(DevicePermission),

    #[error("camera unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("capture failed: {reason}")]
    CaptureFailed { reason: String },

    #[error("asset not found: {uri}")]
    AssetNotFound { uri: String },

    #[error("operation cancelled - another operation in progress")]
    Busy,

    #[error("unexpected shell response: {0}")]
    UnexpectedOutput(String),
}

impl CameraError {
    #[must_use]
    pub const fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    fn unexpected(expected: &str, got: &CameraOutput) -> Self {
        Self::UnexpectedOutput(format!("expected {expected}, got {}", got.describe()))
    }
}

impl Operation for CameraOperation {
    type Output = Result<CameraOutput, CameraError>;
}

pub struct Camera<Ev> {
    context: CapabilityContext<CameraOperation, Ev>,
}

impl<Ev> Capability<Ev> for Camera<Ev> {
    type Operation = CameraOperation;
    type MappedSelf<MappedEv> = Camera<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Camera::new(self.context.map_event(f))
    }
}

impl<Ev> Camera<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<CameraOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn request_permission<F>(&self, permission: DevicePermission, make_event: F)
    where
        F: FnOnce(Result<PermissionStatus, CameraError>) -> Ev + Send + 'static,
    {
        self.request(
            CameraOperation::RequestPermission { permission },
            move |output| match output {
                CameraOutput::PermissionStatus(status) => Ok(status),
                other => Err(CameraError::unexpected("permission status", &other)),
            },
            make_event,
        );
    }

    /// `Ok(None)` means the user backed out of the camera.
    pub fn capture_photo<F>(&self, config: PhotoConfig, make_event: F)
    where
        F: FnOnce(Result<Option<CapturedAsset>, CameraError>) -> Ev + Send + 'static,
    {
        self.request(CameraOperation::CapturePhoto(config), captured, make_event);
    }

    pub fn record_video<F>(&self, config: VideoConfig, make_event: F)
    where
        F: FnOnce(Result<Option<CapturedAsset>, CameraError>) -> Ev + Send + 'static,
    {
        self.request(
            CameraOperation::RecordVideo(config.validated()),
            captured,
            make_event,
        );
    }

    pub fn pick_from_library<F>(&self, config: LibraryPickConfig, make_event: F)
    where
        F: FnOnce(Result<Option<CapturedAsset>, CameraError>) -> Ev + Send + 'static,
    {
        self.request(
            CameraOperation::PickFromLibrary(config.validated()),
            captured,
            make_event,
        );
    }

    pub fn load_asset<F>(&self, uri: impl Into<String>, make_event: F)
    where
        F: FnOnce(Result<Vec<u8>, CameraError>) -> Ev + Send + 'static,
    {
        self.request(
            CameraOperation::LoadAsset { uri: uri.into() },
            |output| match output {
                CameraOutput::AssetBytes(bytes) => Ok(bytes),
                other => Err(CameraError::unexpected("asset bytes", &other)),
            },
            make_event,
        );
    }

    fn request<T, P, F>(&self, operation: CameraOperation, parse: P, make_event: F)
    where
        P: FnOnce(CameraOutput) -> Result<T, CameraError> + Send + 'static,
        F: FnOnce(Result<T, CameraError>) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let output = context.request_from_shell(operation).await;
            context.update_app(make_event(output.and_then(parse)));
        });
    }
}

fn captured(output: CameraOutput) -> Result<Option<CapturedAsset>, CameraError> {
    match output {
        CameraOutput::Captured(asset) => Ok(Some(asset)),
        CameraOutput::Cancelled => Ok(None),
        other => Err(CameraError::unexpected("a captured asset", &other)),
    }
}
