//! Archive path component sanitization.

/// Longest allowed path component, in bytes.
pub const MAX_COMPONENT_BYTES: usize = 255;

const REPLACEMENT: char = '_';

fn is_illegal(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
        || c.is_control()
        || c.is_whitespace()
}

/// Turn a remote display name into a safe archive path component.
///
/// Illegal filesystem characters, control characters and whitespace become
/// `_`, trailing dots are dropped and the result is cut to
/// [`MAX_COMPONENT_BYTES`] on a character boundary. Never returns an empty
/// string, `.` or `..`.
///
/// ```
/// use core_export::sanitize::sanitize_name;
///
/// assert_eq!(sanitize_name("Acme Co."), "Acme_Co");
/// assert_eq!(sanitize_name("Design/Files"), "Design_Files");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_illegal(c) { REPLACEMENT } else { c })
        .collect();

    let mut end = replaced.trim_end_matches('.').len().min(MAX_COMPONENT_BYTES);
    while !replaced.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = replaced[..end].trim_end_matches('.');

    if truncated.is_empty() {
        REPLACEMENT.to_string()
    } else {
        truncated.to_string()
    }
}

/// Append a sanitized component to an archive path.
pub fn join(base: &str, name: &str) -> String {
    let component = sanitize_name(name);
    if base.is_empty() {
        component
    } else {
        format!("{}/{}", base.trim_end_matches('/'), component)
    }
}
