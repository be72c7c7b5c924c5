//! Upload classification and object naming.
//!
//! The gateway only accepts a fixed set of media extensions. Each maps to a
//! content type and to the folder the object is stored under.

use chrono::{DateTime, Utc};
use mime::Mime;

use crate::error::{GatewayError, GatewayResult};

/// Folder holding image uploads.
pub const IMAGES_FOLDER: &str = "images";

/// Folder holding video and audio uploads.
pub const VIDEOS_FOLDER: &str = "videos";

/// Broad media category of an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `jpg`, `jpeg`, `png`, `gif`.
    Image,
    /// `mp4`, `mkv`, `avi`.
    Video,
    /// `mp3`, `wav`, `flac`.
    Audio,
}

impl MediaKind {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" | "png" | "gif" => Some(Self::Image),
            "mp4" | "mkv" | "avi" => Some(Self::Video),
            "mp3" | "wav" | "flac" => Some(Self::Audio),
            _ => None,
        }
    }

    fn top_level(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    /// Folder objects of this kind are stored under.
    #[must_use]
    pub fn folder(self) -> &'static str {
        match self {
            Self::Image => IMAGES_FOLDER,
            // Audio shares the video folder.
            Self::Video | Self::Audio => VIDEOS_FOLDER,
        }
    }
}

/// How an uploaded file will be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadClass {
    /// Lowercased extension without the dot.
    pub extension: String,
    /// Media category.
    pub kind: MediaKind,
    /// Content type recorded on the object, e.g. `image/png`.
    pub content_type: Mime,
}

impl UploadClass {
    /// Target folder for this upload.
    #[must_use]
    pub fn folder(&self) -> &'static str {
        self.kind.folder()
    }
}

/// Classify an uploaded file by the extension of `filename`.
///
/// The extension is whatever follows the last `.`, compared
/// case-insensitively.
///
/// # Errors
///
/// Returns [`GatewayError::UnsupportedFileType`] for any extension outside the
/// accepted set, including files with no extension.
///
/// # Examples
///
/// ```
/// use objgate_core::upload::classify;
///
/// let class = classify("Holiday.JPG").unwrap();
/// assert_eq!(class.content_type.essence_str(), "image/jpg");
/// assert_eq!(class.folder(), "images");
/// assert!(classify("notes.txt").is_err());
/// ```
pub fn classify(filename: &str) -> GatewayResult<UploadClass> {
    let extension = filename
        .rsplit_once('.')
        .map_or("", |(_, ext)| ext)
        .to_ascii_lowercase();

    let Some(kind) = MediaKind::from_extension(&extension) else {
        return Err(GatewayError::UnsupportedFileType { extension });
    };

    let content_type: Mime = format!("{}/{extension}", kind.top_level())
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid content type for {extension}: {e}"))?;

    Ok(UploadClass {
        extension,
        kind,
        content_type,
    })
}

/// Generate the object name for an upload made at `now`.
///
/// The format is `YYYYMMDD_HHMMSS_<unix nanos>.<ext>`, which sorts
/// chronologically and is unique per nanosecond.
#[must_use]
pub fn object_name(now: DateTime<Utc>, extension: &str) -> String {
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
    format!("{}_{nanos}.{extension}", now.format("%Y%m%d_%H%M%S"))
}
