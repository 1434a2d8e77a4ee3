//! Inline elements carried by OSC escape sequences
//!
//! Build tools embed non-text content in their output through a small set
//! of OSC payloads:
//!
//! - `8;params;url`: an OSC 8 hyperlink toggle
//! - `1337;File=key=value;...:BASE64`: an iTerm-style inline image
//! - `1338;key=value;...`: an external image
//! - `1339;key=value;...`: an external link
//!
//! Parsing produces an [`Element`] record that lives in the owning screen
//! line's element table; rendering emits `<img>`/`<a>` markup with every
//! attribute value HTML-escaped and URLs vetted by the sanitizer.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::output::html_escape;
use crate::url::{sanitize_url, UNSAFE_URL_SUBSTITUTION};

/// The kind of inline element a cell can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// `1337;File=`: image data embedded in the stream as Base64.
    InlineImage,
    /// `1338;`: image referenced by URL.
    ExternalImage,
    /// `1339;`: hyperlink rendered inline with its surrounding text.
    Link,
    /// `8;`: an OSC 8 link toggle. Never rendered as a standalone element;
    /// it switches the screen's URL brush on and off instead.
    Osc8Link,
}

/// An inline element parsed from an OSC payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub url: String,
    pub alt: String,
    pub content_type: String,
    pub content: String,
    pub width: String,
    pub height: String,
}

impl Element {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            url: String::new(),
            alt: String::new(),
            content_type: String::new(),
            content: String::new(),
            width: String::new(),
            height: String::new(),
        }
    }

    /// Renders this element as HTML. External images whose URL fails the
    /// sanitizer are suppressed entirely.
    pub fn as_html(&self) -> String {
        if self.kind == ElementKind::Link {
            let content = if self.content.is_empty() {
                &self.url
            } else {
                &self.content
            };
            return format!(
                r#"<a href="{}">{}</a>"#,
                html_escape(sanitize_url(&self.url)),
                html_escape(content)
            );
        }

        let alt = if self.alt.is_empty() {
            &self.url
        } else {
            &self.alt
        };
        let mut parts = vec![format!(r#"alt="{}""#, html_escape(alt))];

        match self.kind {
            ElementKind::InlineImage => {
                parts.push(format!(
                    r#"src="data:{};base64,{}""#,
                    html_escape(&self.content_type),
                    html_escape(&self.content)
                ));
            }
            ElementKind::ExternalImage => {
                let url = sanitize_url(&self.url);
                if url.is_empty() || url == UNSAFE_URL_SUBSTITUTION {
                    return String::new();
                }
                parts.push(format!(r#"src="{}""#, html_escape(url)));
            }
            _ => return String::new(),
        }

        if !self.width.is_empty() {
            parts.push(format!(r#"width="{}""#, html_escape(&self.width)));
        }
        if !self.height.is_empty() {
            parts.push(format!(r#"height="{}""#, html_escape(&self.height)));
        }

        format!("<img {}>", parts.join(" "))
    }
}

/// Errors from the semicolon tokenizer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("invalid escape at end of sequence")]
    TrailingEscape,
    #[error("unclosed quotation marks")]
    UnclosedQuotes,
}

/// Errors from element sequence parsing. These are rendered into the
/// screen as error text rather than surfaced to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElementError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error("expected one arguments part and one content part, got {0} part(s)")]
    MalformedPayload(usize),
    #[error("image content missing")]
    MissingContent,
    #[error("expected content part to be valid Base64")]
    InvalidContent,
    #[error("name= value {0:?} is not valid base64")]
    InvalidName(String),
    #[error("name= argument not supplied, required to determine content type")]
    MissingName,
    #[error("can't determine content type for {0:?}")]
    UnknownContentType(String),
    #[error("url= argument not supplied")]
    MissingUrl,
}

/// Parses an OSC payload into an element.
///
/// Returns `Ok(None)` for payloads that are recognized but produce nothing
/// to render (unsupported OSC numbers, malformed OSC 8 parts, images not
/// marked `inline=1`).
pub(crate) fn parse_element_sequence(sequence: &str) -> Result<Option<Element>, ElementError> {
    if let Some(args) = sequence.strip_prefix("8;") {
        // For OSC 8 links the first part is params and the second the URL.
        // Aside from not quoting the URL, params are ignored. The link text
        // follows the sequence as ordinary screen content, so it degrades
        // gracefully when the sequence is unsupported.
        let tokens: Vec<&str> = args.split(';').collect();
        if tokens.len() != 2 {
            return Ok(None);
        }
        let mut elem = Element::new(ElementKind::Osc8Link);
        elem.url = tokens[1].to_string();
        return Ok(Some(elem));
    }

    let (kind, args, content) = if let Some(rest) = sequence.strip_prefix("1338;") {
        (ElementKind::ExternalImage, rest, "")
    } else if let Some(rest) = sequence.strip_prefix("1339;") {
        (ElementKind::Link, rest, "")
    } else if let Some(rest) = sequence.strip_prefix("1337;File=") {
        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() != 2 {
            return Err(ElementError::MalformedPayload(parts.len()));
        }
        if parts[1].is_empty() {
            return Err(ElementError::MissingContent);
        }
        if BASE64.decode(parts[1]).is_err() {
            return Err(ElementError::InvalidContent);
        }
        (ElementKind::InlineImage, parts[0], parts[1])
    } else {
        return Ok(None);
    };

    let mut elem = Element::new(kind);
    elem.content = content.to_string();
    let mut image_inline = false;

    for token in tokenize(args, ';', '\\')? {
        let Some((key, val)) = token.split_once('=') else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "name" => {
                let name = BASE64
                    .decode(val)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
                    .ok_or_else(|| ElementError::InvalidName(val.to_string()))?;
                elem.content_type = content_type_for_file(&name).unwrap_or_default().to_string();
                elem.url = name;
            }
            "url" => elem.url = val.to_string(),
            "content" => elem.content = val.to_string(),
            "inline" => image_inline = val == "1",
            "width" => elem.width = parse_image_dimension(val),
            "height" => elem.height = parse_image_dimension(val),
            "alt" => elem.alt = val.to_string(),
            _ => {}
        }
    }

    if elem.kind == ElementKind::InlineImage {
        if elem.url.is_empty() {
            return Err(ElementError::MissingName);
        }
        if elem.content_type.is_empty() {
            return Err(ElementError::UnknownContentType(elem.url));
        }
        if !image_inline {
            // In iTerm2, images without inline=1 are downloaded rather
            // than displayed.
            return Ok(None);
        }
    } else if elem.url.is_empty() {
        return Err(ElementError::MissingUrl);
    }

    Ok(Some(elem))
}

/// Splits `input` on `sep`, honoring single and double quotes and a
/// one-character escape. Quotes are stripped from the output; an unbalanced
/// escape or quote is a hard error.
pub(crate) fn tokenize(input: &str, sep: char, escape: char) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_escape = false;
    let mut in_single_quotes = false;
    let mut in_double_quotes = false;

    for c in input.chars() {
        if in_escape {
            in_escape = false;
            current.push(c);
            continue;
        }
        match c {
            '\'' if !in_double_quotes => in_single_quotes = !in_single_quotes,
            '"' if !in_single_quotes => in_double_quotes = !in_double_quotes,
            c if c == escape => in_escape = true,
            c if c == sep && !in_single_quotes && !in_double_quotes => {
                tokens.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    tokens.push(current);

    if in_escape {
        return Err(TokenizeError::TrailingEscape);
    }
    if in_single_quotes || in_double_quotes {
        return Err(TokenizeError::UnclosedQuotes);
    }
    Ok(tokens)
}

/// Maps a filename extension to the content type used in data: URIs.
fn content_type_for_file(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "gif" => Some("image/gif"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "ico" => Some("image/vnd.microsoft.icon"),
        "tif" | "tiff" => Some("image/tiff"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Normalizes a width/height value: `px` and `%` suffixes pass through,
/// anything else is measured in `em`.
fn parse_image_dimension(value: &str) -> String {
    let value = value.to_ascii_lowercase();
    if value.ends_with("px") || value.ends_with('%') {
        value
    } else {
        value + "em"
    }
}
