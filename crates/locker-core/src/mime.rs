//! MIME allow-list guard

use crate::error::CoreError;

/// MIME type recorded when a session carries no hint
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Fixed default allow-list for uploaded evidence
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "text/csv",
    "application/json",
    "application/zip",
    "application/x-zip-compressed",
    "text/plain",
    "application/octet-stream",
];

/// Check a declared MIME type against the allow-list (case-insensitive)
pub fn validate(mime: &str) -> Result<(), CoreError> {
    let lowered = mime.to_ascii_lowercase();
    if ALLOWED_MIME_TYPES.contains(&lowered.as_str()) {
        Ok(())
    } else {
        Err(CoreError::UnsupportedMime(mime.to_string()))
    }
}

/// Best-effort MIME from the trailing filename extension
pub fn guess_from_filename(name: &str) -> Option<&'static str> {
    let extension = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "csv" => Some("text/csv"),
        "json" => Some("application/json"),
        "zip" => Some("application/zip"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}
