//! Predicate and assertion helpers shared by event validation and plugin
//! option validation.
//!
//! Predicates (`is_*`) answer yes/no; their `ensure_*` twins report a
//! [`ValidationIssue`] so callers can collect every problem in one pass
//! instead of stopping at the first.

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::Url;

/// A single problem found while validating an event or plugin options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Attribute or option the issue refers to, e.g. `source` or `extensions.traceid`.
    pub location: String,
    /// Issue class: `missing`, `format`, `type` or `schema`.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Render a list of issues as a single `;`-separated line for error messages
/// and log fields.
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("[{}] {}: {}", i.kind, i.location, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    // Reverse-DNS style: at least two dot-separated lowercase segments.
    Regex::new(r"^[a-z][a-z0-9_-]*(\.[a-z0-9_-]+)+$").expect("namespace regex is valid")
});

static EXTENSION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    // CloudEvents extension attribute names: lowercase letters and digits only.
    Regex::new(r"^[a-z0-9]{1,20}$").expect("extension name regex is valid")
});

static CONTENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9!#$&^_.+-]+/[a-zA-Z0-9!#$&^_.+-]+(;.*)?$")
        .expect("content type regex is valid")
});

static URI_REFERENCE_BASE: Lazy<Url> = Lazy::new(|| {
    Url::parse("cloudhooks:/").expect("base url is valid")
});

pub fn is_defined(value: &Value) -> bool {
    !value.is_null()
}

pub fn is_string_not_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn is_object_or_array(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// The only spec version the bundled event model understands.
pub fn is_spec_version(value: &str) -> bool {
    value == crate::event::SPEC_VERSION
}

/// Absolute URL, e.g. a plugin base URL.
pub fn is_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// URI-reference per RFC 3986: absolute URIs and relative references such as
/// `/orders/42` both qualify.
pub fn is_uri_reference(value: &str) -> bool {
    if value.is_empty() || value.contains(char::is_whitespace) {
        return false;
    }
    Url::parse(value).is_ok() || URI_REFERENCE_BASE.join(value).is_ok()
}

pub fn is_rfc3339(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

/// Reverse-DNS event type namespace, e.g. `com.example.orders`.
pub fn is_namespace(value: &str) -> bool {
    NAMESPACE_RE.is_match(value)
}

/// CloudEvents extension attribute name: 1-20 lowercase alphanumerics.
pub fn is_extension_name(value: &str) -> bool {
    EXTENSION_NAME_RE.is_match(value)
}

pub fn is_content_type(value: &str) -> bool {
    CONTENT_TYPE_RE.is_match(value)
}

pub fn ensure_string_not_empty(location: &str, value: &str) -> Result<(), ValidationIssue> {
    if is_string_not_empty(value) {
        Ok(())
    } else {
        Err(ValidationIssue::new(location, "missing", "must be a non-empty string"))
    }
}

pub fn ensure_spec_version(location: &str, value: &str) -> Result<(), ValidationIssue> {
    if is_spec_version(value) {
        Ok(())
    } else {
        Err(ValidationIssue::new(
            location,
            "format",
            format!("unsupported spec version `{value}`, expected `{}`", crate::event::SPEC_VERSION),
        ))
    }
}

pub fn ensure_url(location: &str, value: &str) -> Result<(), ValidationIssue> {
    if is_url(value) {
        Ok(())
    } else {
        Err(ValidationIssue::new(location, "format", format!("`{value}` is not a valid URL")))
    }
}

pub fn ensure_uri_reference(location: &str, value: &str) -> Result<(), ValidationIssue> {
    if is_uri_reference(value) {
        Ok(())
    } else {
        Err(ValidationIssue::new(
            location,
            "format",
            format!("`{value}` is not a valid URI reference"),
        ))
    }
}

pub fn ensure_namespace(location: &str, value: &str) -> Result<(), ValidationIssue> {
    if is_namespace(value) {
        Ok(())
    } else {
        Err(ValidationIssue::new(
            location,
            "format",
            format!("`{value}` is not a reverse-DNS namespace"),
        ))
    }
}

pub fn ensure_extension_name(location: &str, value: &str) -> Result<(), ValidationIssue> {
    if is_extension_name(value) {
        Ok(())
    } else {
        Err(ValidationIssue::new(
            location,
            "format",
            format!("`{value}` is not a valid extension attribute name"),
        ))
    }
}

pub fn ensure_content_type(location: &str, value: &str) -> Result<(), ValidationIssue> {
    if is_content_type(value) {
        Ok(())
    } else {
        Err(ValidationIssue::new(
            location,
            "format",
            format!("`{value}` is not a valid content type"),
        ))
    }
}
