//! Media validation and upload.
//!
//! Attachments go through two stages before a tweet references them:
//!
//! 1. **Validation**: the local file is resolved to an absolute path,
//!    stat'ed once, and checked against the class-specific size ceiling and
//!    extension table. No file content is inspected; the extension is
//!    trusted.
//! 2. **Upload**: the whole file is read into memory and handed to the
//!    remote client, which returns an opaque media ID. The ID is used in
//!    exactly one tweet and has no lifecycle beyond that action.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::twitter::{ApiError, MediaUpload, TwitterApi};

/// Size ceiling for images: 5 MiB.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Size ceiling for video: 512 MiB.
pub const MAX_VIDEO_BYTES: u64 = 512 * 1024 * 1024;

/// Video sources above this size are flagged as long-form on upload.
/// A request hint only; the accepted ceiling stays [`MAX_VIDEO_BYTES`].
pub const LONG_VIDEO_THRESHOLD_BYTES: u64 = 15 * 1024 * 1024;

/// Extension-to-content-type table for images.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// Extension-to-content-type table for video.
const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("webm", "video/webm"),
    ("m4v", "video/x-m4v"),
];

/// The two media classes a tweet can attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    /// Still image (png, jpg, jpeg, gif, webp), at most 5 MiB.
    Image,
    /// Video (mp4, mov, avi, webm, m4v), at most 512 MiB.
    Video,
}

impl MediaClass {
    /// Size ceiling in bytes for this class.
    #[must_use]
    pub const fn max_bytes(self) -> u64 {
        match self {
            Self::Image => MAX_IMAGE_BYTES,
            Self::Video => MAX_VIDEO_BYTES,
        }
    }

    /// Extension-to-content-type table for this class.
    #[must_use]
    pub const fn content_types(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Image => IMAGE_TYPES,
            Self::Video => VIDEO_TYPES,
        }
    }

    /// Comma-separated list of supported extensions, for error messages.
    #[must_use]
    pub fn supported_extensions(self) -> String {
        self.content_types()
            .iter()
            .map(|(ext, _)| *ext)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Looks up the content type for a lowercase extension.
    #[must_use]
    pub fn content_type_for(self, extension: &str) -> Option<&'static str> {
        self.content_types()
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, content_type)| *content_type)
    }
}

impl fmt::Display for MediaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// A validated media file, ready for upload.
///
/// Ephemeral: constructed per upload attempt and discarded once the remote
/// call returns a media ID or the action fails.
#[derive(Debug, Clone)]
pub struct MediaFile {
    path: PathBuf,
    size: u64,
    content_type: &'static str,
}

impl MediaFile {
    /// Absolute path the file will be read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Content type mapped from the file extension.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        self.content_type
    }
}

/// Validation failures. All are local and pre-flight; none reach the
/// remote side.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The path does not exist or is not a regular file.
    #[error("File not found or not a regular file: {}", path.display())]
    NotFound {
        /// The resolved path that was probed.
        path: PathBuf,
    },

    /// The file exceeds the class-specific size ceiling.
    #[error("{class} too large: {size_mib:.2} MiB (maximum {max_mib} MiB)")]
    TooLarge {
        /// The media class whose ceiling was exceeded.
        class: MediaClass,
        /// Observed size in MiB.
        size_mib: f64,
        /// Ceiling in MiB.
        max_mib: u64,
    },

    /// The extension is absent or outside the class's supported set.
    #[error("Unsupported {class} format '{extension}'. Supported formats: {supported}")]
    UnsupportedFormat {
        /// The media class that was requested.
        class: MediaClass,
        /// The offending extension, or "(none)".
        extension: String,
        /// The class's supported extension list.
        supported: String,
    },
}

/// Validates a local file against a media class.
///
/// The path is resolved to absolute form lexically before any filesystem
/// check, so relative and traversal components are neutralised; the
/// resolved path is what gets probed and later opened.
///
/// # Errors
///
/// Returns [`MediaError::NotFound`] for missing paths and non-regular
/// files (directories are rejected explicitly), [`MediaError::TooLarge`]
/// above the class ceiling, and [`MediaError::UnsupportedFormat`] for
/// absent or unknown extensions.
pub async fn validate(path: &str, class: MediaClass) -> Result<MediaFile, MediaError> {
    let resolved = std::path::absolute(path).map_err(|_| MediaError::NotFound {
        path: PathBuf::from(path),
    })?;

    let Ok(metadata) = tokio::fs::metadata(&resolved).await else {
        return Err(MediaError::NotFound { path: resolved });
    };
    if !metadata.is_file() {
        return Err(MediaError::NotFound { path: resolved });
    }

    let size = metadata.len();
    if size > class.max_bytes() {
        #[allow(clippy::cast_precision_loss)] // sizes are far below 2^52
        return Err(MediaError::TooLarge {
            class,
            size_mib: size as f64 / (1024.0 * 1024.0),
            max_mib: class.max_bytes() / (1024 * 1024),
        });
    }

    let extension = resolved
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_lowercase);

    let content_type = extension
        .as_deref()
        .and_then(|ext| class.content_type_for(ext))
        .ok_or_else(|| MediaError::UnsupportedFormat {
            class,
            extension: extension.unwrap_or_else(|| "(none)".to_string()),
            supported: class.supported_extensions(),
        })?;

    Ok(MediaFile {
        path: resolved,
        size,
        content_type,
    })
}

/// Upload failures.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The validated file could not be read back.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The remote upload call failed.
    #[error("{0}")]
    Remote(#[from] ApiError),
}

/// Hands validated bytes to the remote client's media endpoint.
pub struct MediaUploader {
    client: Arc<dyn TwitterApi>,
}

impl MediaUploader {
    /// Creates an uploader backed by the given client.
    #[must_use]
    pub fn new(client: Arc<dyn TwitterApi>) -> Self {
        Self { client }
    }

    /// Uploads a validated file and returns the remote media ID.
    ///
    /// The whole file is read into memory (no streaming). Video sources
    /// above [`LONG_VIDEO_THRESHOLD_BYTES`] are flagged as long-form.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Read`] if the file cannot be read back and
    /// [`UploadError::Remote`] for any remote-side failure.
    pub async fn upload(&self, file: &MediaFile, class: MediaClass) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(file.path())
            .await
            .map_err(|e| UploadError::Read {
                path: file.path().to_path_buf(),
                source: e,
            })?;

        let long_video = class == MediaClass::Video && file.size() > LONG_VIDEO_THRESHOLD_BYTES;
        tracing::info!(
            path = %file.path().display(),
            size = file.size(),
            content_type = file.content_type(),
            long_video,
            "Uploading media"
        );

        let media_id = self
            .client
            .upload_media(MediaUpload {
                bytes,
                content_type: file.content_type().to_string(),
                long_video,
            })
            .await?;

        Ok(media_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_table_maps_exactly() {
        assert_eq!(MediaClass::Image.content_type_for("png"), Some("image/png"));
        assert_eq!(MediaClass::Image.content_type_for("jpg"), Some("image/jpeg"));
        assert_eq!(MediaClass::Image.content_type_for("jpeg"), Some("image/jpeg"));
        assert_eq!(MediaClass::Image.content_type_for("gif"), Some("image/gif"));
        assert_eq!(MediaClass::Image.content_type_for("webp"), Some("image/webp"));
        assert_eq!(MediaClass::Image.content_type_for("mp4"), None);
    }

    #[test]
    fn video_table_maps_exactly() {
        assert_eq!(MediaClass::Video.content_type_for("mp4"), Some("video/mp4"));
        assert_eq!(MediaClass::Video.content_type_for("mov"), Some("video/quicktime"));
        assert_eq!(MediaClass::Video.content_type_for("avi"), Some("video/x-msvideo"));
        assert_eq!(MediaClass::Video.content_type_for("webm"), Some("video/webm"));
        assert_eq!(MediaClass::Video.content_type_for("m4v"), Some("video/x-m4v"));
        assert_eq!(MediaClass::Video.content_type_for("png"), None);
    }

    #[test]
    fn class_ceilings() {
        assert_eq!(MediaClass::Image.max_bytes(), 5 * 1024 * 1024);
        assert_eq!(MediaClass::Video.max_bytes(), 512 * 1024 * 1024);
    }

    #[test]
    fn supported_extension_lists() {
        assert_eq!(
            MediaClass::Image.supported_extensions(),
            "png, jpg, jpeg, gif, webp"
        );
        assert_eq!(
            MediaClass::Video.supported_extensions(),
            "mp4, mov, avi, webm, m4v"
        );
    }

    #[test]
    fn too_large_message_has_two_decimals() {
        let error = MediaError::TooLarge {
            class: MediaClass::Image,
            size_mib: 6.5,
            max_mib: 5,
        };
        assert_eq!(
            error.to_string(),
            "image too large: 6.50 MiB (maximum 5 MiB)"
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let error = validate("/definitely/not/here.png", MediaClass::Image)
            .await
            .unwrap_err();
        assert!(matches!(error, MediaError::NotFound { .. }));
    }
}
