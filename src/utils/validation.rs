use std::path::Path;

/// Name used when an upload's filename sanitizes to nothing
pub const FALLBACK_FILENAME: &str = "video";

/// Longest file name most filesystems accept, in bytes
pub const MAX_FILENAME_LEN: usize = 255;

/// Extensions longer than this are treated as part of the stem when truncating
const MAX_EXTENSION_LEN: usize = 16;

/// Sanitizes an uploaded filename so it is safe to use inside the upload
/// directory, capped at `max_len` bytes. Never fails: names that collapse to
/// nothing become [`FALLBACK_FILENAME`].
pub fn sanitize_filename(filename: &str, max_len: usize) -> String {
    // Normalize Windows separators before taking the final component
    let normalized = filename.replace('\\', "/");
    let name = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from upload name: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c.is_whitespace()
                || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';')
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '_') {
        return truncate_to(FALLBACK_FILENAME, max_len).to_string();
    }

    truncate_keeping_extension(sanitized, max_len)
}

/// Shorten the stem so the whole name fits in `max_len` bytes, keeping a
/// short extension intact
fn truncate_keeping_extension(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }

    if let Some(dot) = name.rfind('.') {
        let ext = &name[dot..];
        if dot > 0 && ext.len() <= MAX_EXTENSION_LEN && ext.len() < max_len {
            let stem = truncate_to(&name[..dot], max_len - ext.len());
            if !stem.is_empty() {
                return format!("{}{}", stem, ext);
            }
        }
    }

    truncate_to(name, max_len).to_string()
}

/// Limit length safely for UTF-8
fn truncate_to(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(name: &str) -> String {
        sanitize_filename(name, MAX_FILENAME_LEN)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize("my clip.mov"), "my_clip.mov");
        assert_eq!(sanitize("a<b>|c.avi"), "a_b__c.avi");
        assert_eq!(sanitize("日本語.mp4"), "日本語.mp4");
    }

    #[test]
    fn test_path_traversal_is_stripped() {
        assert_eq!(sanitize("../../../etc/passwd"), "passwd");
        assert_eq!(sanitize("..\\..\\windows\\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize("/abs/path/video.webm"), "video.webm");
    }

    #[test]
    fn test_hidden_and_empty_names() {
        assert_eq!(sanitize(".hidden.mp4"), "hidden.mp4");
        assert_eq!(sanitize(""), FALLBACK_FILENAME);
        assert_eq!(sanitize(".."), FALLBACK_FILENAME);
        assert_eq!(sanitize("???"), FALLBACK_FILENAME);
    }

    #[test]
    fn test_length_is_capped_on_char_boundary() {
        let long = format!("{}.mp4", "é".repeat(200));
        let sanitized = sanitize(&long);
        assert!(sanitized.len() <= MAX_FILENAME_LEN);
        assert!(sanitized.starts_with('é'));
        assert!(sanitized.ends_with(".mp4"));
    }

    #[test]
    fn test_custom_budget_keeps_extension() {
        let long = format!("{}.mp4", "a".repeat(246));
        let sanitized = sanitize_filename(&long, 200);
        assert_eq!(sanitized.len(), 200);
        assert!(sanitized.ends_with(".mp4"));

        assert_eq!(sanitize_filename("clip.mp4", 200), "clip.mp4");
        assert_eq!(sanitize_filename("abcdefghij", 4), "abcd");
        assert_eq!(sanitize_filename("", 3), "vid");
    }
}
