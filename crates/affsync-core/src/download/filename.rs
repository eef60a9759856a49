//! Deterministic local filenames for order downloads.
//!
//! The name derives from the order identifier, never from server-supplied
//! strings, so re-runs map each order to the same path and the dedup check
//! stays stable. The URL only contributes a file extension when its path has
//! a plausible one.

/// Extension used when the URL path has none (conversion links resolve to
/// landing pages).
const DEFAULT_EXTENSION: &str = "html";

/// Sanitizes a candidate name component for safe use on Linux.
///
/// Replaces NUL, path separators, whitespace, and control characters with
/// `_`, collapses runs of `_`, trims leading/trailing dots and underscores,
/// and caps the length at 200 bytes (leaving room for prefix and extension
/// within NAME_MAX).
pub fn sanitize_component(name: &str) -> String {
    const MAX: usize = 200;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let replacement = if c == '\0' || c == '/' || c == '\\' || c.is_control() || c.is_whitespace()
        {
            '_'
        } else {
            c
        };
        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.len() > MAX {
        let mut take = MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extension from the URL's last path segment, if it looks like one
/// (short, alphanumeric).
fn extension_from_url(file_url: &str) -> Option<String> {
    let parsed = url::Url::parse(file_url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Target filename for an order download, e.g. `order_1003.html`.
pub fn target_filename(order_no: &str, file_url: &str) -> String {
    let stem = sanitize_component(order_no);
    let stem = if stem.is_empty() { "unknown" } else { &stem };
    let ext = extension_from_url(file_url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("order_{}.{}", stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_from_order_no_with_default_extension() {
        assert_eq!(
            target_filename("1003", "https://links.example.com/conv?subid=a&tid=1003"),
            "order_1003.html"
        );
    }

    #[test]
    fn url_path_extension_is_used() {
        assert_eq!(
            target_filename("1003", "https://cdn.example.com/receipts/1003.pdf"),
            "order_1003.pdf"
        );
        assert_eq!(
            target_filename("1003", "https://cdn.example.com/receipts/1003.PDF?x=1"),
            "order_1003.pdf"
        );
    }

    #[test]
    fn implausible_extensions_are_ignored() {
        assert_eq!(
            target_filename("1", "https://x.example.com/a.verylongext123"),
            "order_1.html"
        );
        assert_eq!(
            target_filename("1", "https://x.example.com/a.%7B%7D"),
            "order_1.html"
        );
    }

    #[test]
    fn same_order_same_name() {
        let a = target_filename("1003", "https://links.example.com/conv?subid=a");
        let b = target_filename("1003", "https://links.example.com/conv?subid=b");
        assert_eq!(a, b);
    }

    #[test]
    fn hostile_order_ids_are_sanitized() {
        assert_eq!(
            target_filename("../../etc/passwd", "https://x.example.com/"),
            "order_etc_passwd.html"
        );
    }

    #[test]
    fn sanitize_basics() {
        assert_eq!(sanitize_component("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_component("  ..  x  "), "x");
        assert_eq!(sanitize_component("a___b"), "a_b");
        assert_eq!(sanitize_component("a\x00b"), "a_b");
    }
}
