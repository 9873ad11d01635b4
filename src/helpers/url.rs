//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello/") // -> "/blog/post/hello/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Whether `uid` is a slug that can be used as a path segment
pub fn is_valid_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Route of a post page, relative to the root
pub fn post_path(uid: &str) -> String {
    format!("post/{}/", uid)
}

/// Route of listing page `n` (1-based); page 1 is the home page
pub fn page_path(n: usize) -> String {
    if n <= 1 {
        String::new()
    } else {
        format!("page/{}/", n)
    }
}

/// Append the preview ref to a link so navigation stays in preview mode
pub fn with_preview(url: &str, preview_ref: Option<&str>) -> String {
    match preview_ref {
        Some(r) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{}{}preview={}", url, sep, encode_component(r))
        }
        None => url.to_string(),
    }
}

/// Query components keep RFC 3986 unreserved characters as they are
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a query component
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, QUERY_COMPONENT).to_string()
}
