//! Deterministic object-store key derivation

/// Derive the bucket key for a blob:
/// `sha256/<d[0:2]>/<d[2:4]>/<d>/<sanitized-filename>`.
///
/// `digest` must be at least 4 characters; callers validate real digests
/// with the digest engine first. Staging keys pass a random hex token in
/// the digest position, which shards the same way.
pub fn bucket_key(digest: &str, filename: &str) -> String {
    format!(
        "sha256/{}/{}/{}/{}",
        &digest[..2],
        &digest[2..4],
        digest,
        sanitize_filename(filename)
    )
}

/// Sanitize a display filename for use as the final key segment.
///
/// Deterministic and idempotent; the same sanitized form is stored on
/// the artifact.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => out.push('_'),
            _ => out.push(c),
        }
    }
    let out = out.replace("..", "_");
    let out = out.trim_start_matches('.').trim().to_string();
    if out.is_empty() { "file".to_string() } else { out }
}
