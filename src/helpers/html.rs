//! HTML helper functions

/// Escape HTML special characters
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// The URL if it is a web, mail or same-site link; `None` for anything
/// else (`javascript:`, `data:`, ...)
pub fn safe_url(url: &str) -> Option<&str> {
    let lower = url.trim().to_ascii_lowercase();
    let allowed = ["http://", "https://", "mailto:", "/", "#"];
    if allowed.iter().any(|p| lower.starts_with(p)) {
        Some(url.trim())
    } else {
        None
    }
}
