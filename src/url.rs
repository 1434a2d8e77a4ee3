//! URL sanitization for rendered links and images
//!
//! Build output is untrusted, so every URL that ends up in an `href` or
//! `src` attribute goes through an allow-list first.

use url::{ParseError, Url};

/// Substituted for URLs that fail the allow-list.
pub(crate) const UNSAFE_URL_SUBSTITUTION: &str = "#";

/// Schemes permitted in rendered output.
const ALLOWED_SCHEMES: [&str; 3] = ["https", "http", "artifact"];

/// Vets a URL for inclusion in rendered output.
///
/// Relative URLs (no scheme) and the allow-listed schemes pass through
/// unchanged; anything else, including unparseable input, is replaced with
/// `#`. The caller is still responsible for HTML-escaping the result.
pub(crate) fn sanitize_url(s: &str) -> &str {
    match Url::parse(s) {
        Ok(url) if ALLOWED_SCHEMES.contains(&url.scheme()) => s,
        // No scheme at all: relative URLs are permitted.
        Err(ParseError::RelativeUrlWithoutBase) => s,
        // Default deny, catches e.g. "javascript:…".
        _ => UNSAFE_URL_SUBSTITUTION,
    }
}
