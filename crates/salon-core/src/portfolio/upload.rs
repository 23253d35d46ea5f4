//! Upload policy for portfolio images.
//!
//! A request carries 1 to [`MAX_FILES`] files. Every file must declare an
//! `image/*` content type and fit in [`MAX_FILE_SIZE`] bytes. The whole
//! batch is checked before anything is stored, and the first offending file
//! rejects the request.

use std::path::Path;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::error::{Result, SalonError};

/// Maximum number of files accepted in one upload request.
pub const MAX_FILES: usize = 10;

/// Maximum size of a single file (5 MiB).
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// One file taken from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side file name, used only for its extension.
    pub original_name: Option<String>,
    /// Declared MIME type of the part.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            original_name: Some(original_name.into()),
            content_type: Some(content_type.into()),
            data,
        }
    }

    fn display_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or("<unnamed>")
    }

    fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }

    /// Lowercased extension of the original name including the dot, or an
    /// empty string when there is none.
    pub fn extension(&self) -> String {
        self.original_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

/// Check a whole upload batch, failing on the first invalid file.
pub fn check_batch(files: &[UploadedFile]) -> Result<()> {
    if files.is_empty() {
        return Err(SalonError::validation("No files uploaded"));
    }
    if files.len() > MAX_FILES {
        return Err(SalonError::validation(format!(
            "Too many files: {} submitted, maximum is {MAX_FILES}",
            files.len()
        )));
    }

    for file in files {
        if !file.is_image() {
            return Err(SalonError::validation(format!(
                "Only image files are allowed: {} has type {}",
                file.display_name(),
                file.content_type.as_deref().unwrap_or("unknown")
            )));
        }
        if file.data.is_empty() {
            return Err(SalonError::validation(format!(
                "Empty file provided: {}",
                file.display_name()
            )));
        }
        if file.data.len() > MAX_FILE_SIZE {
            return Err(SalonError::validation(format!(
                "File too large: {} is {} bytes, maximum is {MAX_FILE_SIZE} bytes ({}MB)",
                file.display_name(),
                file.data.len(),
                MAX_FILE_SIZE / 1024 / 1024
            )));
        }
    }

    Ok(())
}

/// Storage name for an accepted file: `<unix-millis>-<random><ext>`.
pub fn unique_filename(file: &UploadedFile, now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    format!("{}-{suffix}{}", now.timestamp_millis(), file.extension())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn jpeg(size: usize) -> UploadedFile {
        UploadedFile::new("photo.JPG", "image/jpeg", vec![0xFF; size])
    }

    fn assert_validation(result: Result<()>, needle: &str) {
        match result {
            Err(SalonError::Validation(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {msg}")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_small_images() {
        check_batch(&[jpeg(3 * 1024 * 1024), jpeg(10)]).unwrap();
    }

    #[test]
    fn rejects_empty_batch() {
        assert_validation(check_batch(&[]), "No files");
    }

    #[test]
    fn rejects_more_than_ten_files() {
        let files = vec![jpeg(1); MAX_FILES + 1];
        assert_validation(check_batch(&files), "Too many files");
        check_batch(&files[..MAX_FILES]).unwrap();
    }

    #[test]
    fn rejects_oversized_file() {
        assert_validation(check_batch(&[jpeg(6 * 1024 * 1024)]), "too large");
        check_batch(&[jpeg(MAX_FILE_SIZE)]).unwrap();
    }

    #[test]
    fn mixed_batch_is_rejected_as_a_whole() {
        let text = UploadedFile::new("notes.txt", "text/plain", b"hello".to_vec());
        assert_validation(
            check_batch(&[jpeg(3 * 1024 * 1024), text]),
            "Only image files",
        );
    }

    #[test]
    fn missing_content_type_is_not_an_image() {
        let file = UploadedFile {
            original_name: Some("a.png".into()),
            content_type: None,
            data: vec![1],
        };
        assert_validation(check_batch(&[file]), "Only image files");
    }

    #[test]
    fn extension_is_lowercased_and_optional() {
        assert_eq!(jpeg(1).extension(), ".jpg");
        let bare = UploadedFile::new("README", "image/png", vec![1]);
        assert_eq!(bare.extension(), "");
        let nameless = UploadedFile {
            original_name: None,
            content_type: Some("image/png".into()),
            data: vec![1],
        };
        assert_eq!(nameless.extension(), "");
    }

    #[test]
    fn unique_filename_has_timestamp_and_extension() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let name = unique_filename(&jpeg(1), at);
        assert!(name.starts_with("1700000000123-"), "got {name}");
        assert!(name.ends_with(".jpg"), "got {name}");

        let a = unique_filename(&jpeg(1), at);
        let b = unique_filename(&jpeg(1), at);
        // 1 in 1e9 chance of a false failure.
        assert_ne!(a, b);
    }
}
