//! MMS image extraction.
//!
//! MMS parts carry their payload inline as base64. Images of a known type are
//! decoded and written next to the rendered documents under a deterministic
//! name, `<timestamp><sanitized part name>.<ext>`, so re-running over the same
//! backup rewrites the same files.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").unwrap());

/// Image formats that are extracted from MMS parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
}

impl ImageType {
    /// Maps an exact MIME type to an image type.
    ///
    /// ```rust
    /// use smsthread::media::ImageType;
    ///
    /// assert_eq!(ImageType::from_mime("image/jpeg"), Some(ImageType::Jpeg));
    /// assert_eq!(ImageType::from_mime("image/bmp"), None);
    /// ```
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageType::Png),
            "image/jpeg" => Some(ImageType::Jpeg),
            "image/gif" => Some(ImageType::Gif),
            _ => None,
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Jpeg => "jpg",
            ImageType::Gif => "gif",
        }
    }
}

/// Removes every character outside `[A-Za-z0-9_.-]`.
pub fn sanitize_name(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "").into_owned()
}

/// Builds the output filename for an image part.
pub fn image_filename(timestamp: i64, name: &str, image_type: ImageType) -> String {
    format!(
        "{}{}.{}",
        timestamp,
        sanitize_name(name),
        image_type.extension()
    )
}

/// Decodes an image part and writes it into `base_path`.
///
/// Returns the filename (relative to `base_path`) on success. An unsupported
/// MIME type or a payload that isn't valid base64 is logged and yields
/// `Ok(None)` without touching the filesystem. Failing to write the file is
/// an error.
pub fn extract_image(
    base_path: &Path,
    timestamp: i64,
    name: &str,
    mime: &str,
    data: &str,
) -> Result<Option<String>> {
    let Some(image_type) = ImageType::from_mime(mime) else {
        warn!(mime, timestamp, "Unknown MIME type for MMS content; omitting content");
        return Ok(None);
    };

    let filename = image_filename(timestamp, name, image_type);

    // Exporters wrap long payloads; the standard engine rejects whitespace.
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(file = %filename, error = %err, "Failed to decode base64 for image");
            return Ok(None);
        }
    };

    fs::write(base_path.join(&filename), &bytes)?;
    debug!(file = %filename, bytes = bytes.len(), "Extracted MMS image");

    Ok(Some(filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // 1x1 transparent GIF
    const GIF_B64: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

    #[test]
    fn test_image_type_extensions() {
        assert_eq!(ImageType::from_mime("image/png").unwrap().extension(), "png");
        assert_eq!(ImageType::from_mime("image/jpeg").unwrap().extension(), "jpg");
        assert_eq!(ImageType::from_mime("image/gif").unwrap().extension(), "gif");
        assert!(ImageType::from_mime("image/jpg").is_none());
        assert!(ImageType::from_mime("IMAGE/PNG").is_none());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("IMG 0001 (copy).jpg"), "IMG0001copy.jpg");
        assert_eq!(sanitize_name("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_name("snap_shot-1.png"), "snap_shot-1.png");
        assert_eq!(sanitize_name("фото"), "");
    }

    #[test]
    fn test_image_filename() {
        assert_eq!(
            image_filename(1700000000000, "my pic.gif", ImageType::Gif),
            "1700000000000mypic.gif.gif"
        );
    }

    #[test]
    fn test_extract_writes_file() {
        let dir = tempdir().unwrap();
        let name = extract_image(dir.path(), 42, "dot", "image/gif", GIF_B64)
            .unwrap()
            .unwrap();
        assert_eq!(name, "42dot.gif");

        let written = fs::read(dir.path().join(&name)).unwrap();
        assert_eq!(&written[..6], b"GIF89a");
    }

    #[test]
    fn test_extract_tolerates_wrapped_base64() {
        let dir = tempdir().unwrap();
        let wrapped = format!("{}\n{}", &GIF_B64[..20], &GIF_B64[20..]);
        let name = extract_image(dir.path(), 1, "x", "image/gif", &wrapped).unwrap();
        assert!(name.is_some());
    }

    #[test]
    fn test_unknown_mime_is_skipped() {
        let dir = tempdir().unwrap();
        let result =
            extract_image(dir.path(), 1, "blob", "application/octet-stream", GIF_B64).unwrap();
        assert!(result.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_bad_base64_is_skipped() {
        let dir = tempdir().unwrap();
        let result = extract_image(dir.path(), 1, "bad", "image/png", "!!not base64!!").unwrap();
        assert!(result.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = extract_image(&missing, 1, "x", "image/gif", GIF_B64).unwrap_err();
        assert!(err.is_io());
    }
}
