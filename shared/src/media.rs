use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MAX_PHOTO_BYTES, MAX_VIDEO_BYTES};

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    #[must_use]
    pub const fn is_video(self) -> bool {
        matches!(self, Self::Video)
    }

    #[must_use]
    pub const fn max_bytes(self) -> usize {
        match self {
            Self::Photo => MAX_PHOTO_BYTES,
            Self::Video => MAX_VIDEO_BYTES,
        }
    }
}

/// A captured or picked file, referenced by the shell-local URI.
///
/// Don't store media bytes on the model. They are fetched from the shell
/// only at upload time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub uri: String,
    pub kind: MediaKind,
}

impl Attachment {
    #[must_use]
    pub fn new(uri: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            uri: uri.into(),
            kind,
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("kind", &self.kind)
            .field("uri", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MediaError {
    #[error("media file is empty")]
    Empty,
    #[error("media too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

/// Bytes ready for the blob store, tagged with a sniffed content type.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl fmt::Debug for UploadPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadPayload")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

pub fn prepare_upload(kind: MediaKind, bytes: Vec<u8>) -> Result<UploadPayload, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    let max = kind.max_bytes();
    if bytes.len() > max {
        return Err(MediaError::TooLarge {
            size: bytes.len(),
            max,
        });
    }

    let content_type = match kind {
        MediaKind::Photo => sniff_image(&bytes),
        MediaKind::Video => sniff_video(&bytes),
    }
    .unwrap_or_else(|| {
        tracing::debug!(?kind, "unrecognised media signature, uploading as octet-stream");
        FALLBACK_CONTENT_TYPE
    });

    Ok(UploadPayload {
        bytes,
        content_type: content_type.to_owned(),
    })
}

#[must_use]
pub fn sniff_image(data: &[u8]) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(data) {
        return Some(format.to_mime_type());
    }
    match iso_brand(data)? {
        b"heic" | b"heix" | b"mif1" | b"msf1" => Some("image/heic"),
        _ => None,
    }
}

#[must_use]
pub fn sniff_video(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("video/webm");
    }
    match iso_brand(data)? {
        b"qt  " => Some("video/quicktime"),
        b"3gp4" | b"3gp5" | b"3gp6" => Some("video/3gpp"),
        _ => Some("video/mp4"),
    }
}

// ISO base media files open with a box whose type is `ftyp`, followed by
// the major brand.
fn iso_brand(data: &[u8]) -> Option<&[u8; 4]> {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return None;
    }
    data[8..12].try_into().ok()
}

/// Object path in the blob store, e.g. `emergencyMedia/1700000000000`.
#[must_use]
pub fn object_path(prefix: &str, millis: i64) -> String {
    format!("{prefix}/{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
    ];

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut data = vec![0, 0, 0, 0x18];
        data.extend_from_slice(b"ftyp");
        data.extend_from_slice(brand);
        data.extend_from_slice(&[0; 12]);
        data
    }

    #[test]
    fn test_empty_media_rejected() {
        assert_eq!(prepare_upload(MediaKind::Photo, vec![]), Err(MediaError::Empty));
    }

    #[test]
    fn test_oversized_photo_rejected() {
        let bytes = vec![0xFF; MAX_PHOTO_BYTES + 1];
        assert!(matches!(
            prepare_upload(MediaKind::Photo, bytes),
            Err(MediaError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_png_sniffed() {
        let payload = prepare_upload(MediaKind::Photo, PNG_HEADER.to_vec()).unwrap();
        assert_eq!(payload.content_type, "image/png");
    }

    #[test]
    fn test_jpeg_sniffed() {
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0, 1];
        assert_eq!(sniff_image(&jpeg), Some("image/jpeg"));
    }

    #[test]
    fn test_heic_sniffed() {
        assert_eq!(sniff_image(&ftyp(b"heic")), Some("image/heic"));
    }

    #[test]
    fn test_video_containers_sniffed() {
        assert_eq!(sniff_video(&ftyp(b"isom")), Some("video/mp4"));
        assert_eq!(sniff_video(&ftyp(b"qt  ")), Some("video/quicktime"));
        assert_eq!(sniff_video(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F]), Some("video/webm"));
    }

    #[test]
    fn test_unknown_bytes_fall_back_to_octet_stream() {
        let payload = prepare_upload(MediaKind::Video, b"not a video".to_vec()).unwrap();
        assert_eq!(payload.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_object_path() {
        assert_eq!(
            object_path(crate::EMERGENCY_MEDIA_PREFIX, 1_700_000_000_000),
            "emergencyMedia/1700000000000"
        );
    }

    #[test]
    fn test_attachment_debug_hides_uri() {
        let attachment = Attachment::new("file:///private/photo.jpg", MediaKind::Photo);
        assert!(!format!("{attachment:?}").contains("private"));
    }
}
