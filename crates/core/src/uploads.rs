//! Pre-upload checks, filename sanitizing, and storage key derivation for
//! onboarding attachments.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::rate_limit::UploadRateLimiter;
use crate::steps::DocumentType;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum accepted file size (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum accepted original filename length, in characters.
pub const MAX_FILENAME_CHARS: usize = 255;

/// Extensions accepted for KYC documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf"];

/// Extensions accepted for the profile photo.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Anything outside this set is replaced when sanitizing a filename.
static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why a file was refused before any bytes were stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UploadRejection {
    #[error("Unsupported file type '.{extension}'. Allowed: {allowed}")]
    InvalidType { extension: String, allowed: String },

    #[error("File is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Too many uploads; try again in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("File name is {length} characters; the limit is {max}")]
    NameTooLong { length: usize, max: usize },

    #[error("File is empty")]
    Empty,
}

impl UploadRejection {
    /// Short machine-readable reason, as shown to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidType { .. } => "InvalidType",
            Self::TooLarge { .. } => "TooLarge",
            Self::RateLimited { .. } => "RateLimited",
            Self::NameTooLong { .. } => "NameTooLong",
            Self::Empty => "Empty",
        }
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Size and naming limits applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub max_filename_chars: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            max_filename_chars: MAX_FILENAME_CHARS,
        }
    }
}

/// The metadata of a file the client wants to upload.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub file_name: String,
    pub size: u64,
}

/// Lowercased extension after the last `.`, or empty.
pub fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// MIME type for an accepted extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn check_extension(file: &FileCandidate, allowed: &[&str]) -> Result<String, UploadRejection> {
    let ext = file_extension(&file.file_name);
    if allowed.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(UploadRejection::InvalidType {
            extension: ext,
            allowed: allowed.join(", "),
        })
    }
}

fn check_size(file: &FileCandidate, limits: &UploadLimits) -> Result<(), UploadRejection> {
    if file.size == 0 {
        return Err(UploadRejection::Empty);
    }
    if file.size > limits.max_bytes {
        return Err(UploadRejection::TooLarge {
            size: file.size,
            max: limits.max_bytes,
        });
    }
    Ok(())
}

fn check_name(file: &FileCandidate, limits: &UploadLimits) -> Result<(), UploadRejection> {
    let length = file.file_name.chars().count();
    if length > limits.max_filename_chars {
        return Err(UploadRejection::NameTooLong {
            length,
            max: limits.max_filename_chars,
        });
    }
    Ok(())
}

/// Run the document checks in order: type, size, rate, name.
///
/// Only files that pass the type and size checks count against the rate
/// limit. Returns the normalized extension on success.
pub fn validate_document_file(
    file: &FileCandidate,
    limits: &UploadLimits,
    limiter: &UploadRateLimiter,
    onboarding_id: DbId,
) -> Result<String, UploadRejection> {
    let ext = check_extension(file, DOCUMENT_EXTENSIONS)?;
    check_size(file, limits)?;
    limiter
        .check(onboarding_id)
        .map_err(|limited| UploadRejection::RateLimited {
            retry_after_secs: limited.retry_after.as_secs().max(1),
        })?;
    check_name(file, limits)?;
    Ok(ext)
}

/// Checks for the profile photo: image type, size, name. Not rate limited.
pub fn validate_photo_file(
    file: &FileCandidate,
    limits: &UploadLimits,
) -> Result<String, UploadRejection> {
    let ext = check_extension(file, PHOTO_EXTENSIONS)?;
    check_size(file, limits)?;
    check_name(file, limits)?;
    Ok(ext)
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Strip any directory part and replace unsafe characters with `_`.
///
/// Leading dots are dropped so the result can never be a hidden file or a
/// relative path component. An empty result becomes `"file"`.
pub fn sanitize_filename(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Storage key for a KYC document: `{user}/{onboarding}/{type}.{ext}`.
///
/// One key per type, so a re-upload overwrites the previous object.
pub fn document_storage_key(
    user_id: DbId,
    onboarding_id: DbId,
    document_type: DocumentType,
    ext: &str,
) -> String {
    format!("{user_id}/{onboarding_id}/{}.{ext}", document_type.as_str())
}

/// Storage key for the profile photo.
pub fn photo_storage_key(user_id: DbId, onboarding_id: DbId, ext: &str) -> String {
    format!("{user_id}/{onboarding_id}/profile_photo.{ext}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn file(name: &str, size: u64) -> FileCandidate {
        FileCandidate {
            file_name: name.to_string(),
            size,
        }
    }

    // -- validate_document_file --

    #[test]
    fn accepts_supported_types_case_insensitively() {
        let limiter = UploadRateLimiter::default();
        let limits = UploadLimits::default();
        assert_eq!(
            validate_document_file(&file("scan.PDF", 10), &limits, &limiter, 1).unwrap(),
            "pdf"
        );
        assert_eq!(
            validate_document_file(&file("a.jpeg", 10), &limits, &limiter, 2).unwrap(),
            "jpeg"
        );
    }

    #[test]
    fn rejects_unsupported_type() {
        let limiter = UploadRateLimiter::default();
        let err = validate_document_file(
            &file("scan.docx", 10),
            &UploadLimits::default(),
            &limiter,
            1,
        )
        .unwrap_err();
        assert_matches!(err, UploadRejection::InvalidType { ref extension, .. } if extension == "docx");
        assert_eq!(err.code(), "InvalidType");
    }

    #[test]
    fn rejects_twelve_megabyte_pdf() {
        let limiter = UploadRateLimiter::default();
        let err = validate_document_file(
            &file("big.pdf", 12 * 1024 * 1024),
            &UploadLimits::default(),
            &limiter,
            1,
        )
        .unwrap_err();
        assert_eq!(err.code(), "TooLarge");
    }

    #[test]
    fn exactly_ten_megabytes_is_accepted() {
        let limiter = UploadRateLimiter::default();
        assert!(validate_document_file(
            &file("edge.pdf", MAX_UPLOAD_BYTES),
            &UploadLimits::default(),
            &limiter,
            1
        )
        .is_ok());
    }

    #[test]
    fn rejects_empty_file() {
        let limiter = UploadRateLimiter::default();
        let err =
            validate_document_file(&file("a.pdf", 0), &UploadLimits::default(), &limiter, 1)
                .unwrap_err();
        assert_eq!(err, UploadRejection::Empty);
    }

    #[test]
    fn sixth_attempt_within_a_minute_is_rate_limited() {
        let limiter = UploadRateLimiter::default();
        let limits = UploadLimits::default();
        for _ in 0..5 {
            validate_document_file(&file("a.pdf", 10), &limits, &limiter, 9).unwrap();
        }
        let err = validate_document_file(&file("a.pdf", 10), &limits, &limiter, 9).unwrap_err();
        assert_matches!(err, UploadRejection::RateLimited { retry_after_secs } if retry_after_secs >= 1);
        // Another onboarding is unaffected.
        assert!(validate_document_file(&file("a.pdf", 10), &limits, &limiter, 10).is_ok());
    }

    #[test]
    fn type_failures_do_not_consume_rate_budget() {
        let limiter = UploadRateLimiter::default();
        let limits = UploadLimits::default();
        for _ in 0..10 {
            let _ = validate_document_file(&file("a.exe", 10), &limits, &limiter, 3);
        }
        assert!(validate_document_file(&file("a.pdf", 10), &limits, &limiter, 3).is_ok());
    }

    #[test]
    fn rejects_overlong_name() {
        let limiter = UploadRateLimiter::default();
        let name = format!("{}.pdf", "a".repeat(252));
        let err = validate_document_file(&file(&name, 10), &UploadLimits::default(), &limiter, 1)
            .unwrap_err();
        assert_matches!(err, UploadRejection::NameTooLong { length: 256, max: 255 });
    }

    #[test]
    fn photo_rejects_pdf() {
        let err = validate_photo_file(&file("me.pdf", 10), &UploadLimits::default()).unwrap_err();
        assert_eq!(err.code(), "InvalidType");
        assert!(validate_photo_file(&file("me.png", 10), &UploadLimits::default()).is_ok());
    }

    // -- naming --

    #[test]
    fn sanitize_strips_directories_and_unsafe_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pan card.pdf"), "pan_card.pdf");
        assert_eq!(sanitize_filename("résumé (1).pdf"), "r_sum___1_.pdf");
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename("..."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn storage_keys_are_per_type() {
        assert_eq!(
            document_storage_key(7, 42, DocumentType::AadhaarFront, "jpg"),
            "7/42/aadhaar_front.jpg"
        );
        assert_eq!(photo_storage_key(7, 42, "png"), "7/42/profile_photo.png");
    }

    #[test]
    fn extension_and_mime() {
        assert_eq!(file_extension("a.b.JPG"), "jpg");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(mime_for_extension("jpg"), "image/jpeg");
        assert_eq!(mime_for_extension("pdf"), "application/pdf");
    }
}
