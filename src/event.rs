//! # CloudEvent Model
//!
//! A deliberately minimal [CloudEvents v1.0](https://github.com/cloudevents/spec)
//! envelope: the required context attributes, the optional ones the JSON
//! format defines, and flattened extension attributes.
//!
//! ## Overview
//!
//! The model favors the hook fast path over spec completeness: attributes are
//! plain owned fields, serde produces the canonical JSON format directly, and
//! validation reports issues instead of failing construction. Richer concerns
//! (binary content modes, protocol bindings) are out of scope.
//!
//! ## Validation Modes
//!
//! - [`ValidationMode::Lax`] checks only the required attributes.
//! - [`ValidationMode::Strict`] additionally checks attribute formats
//!   (URI-reference source, RFC 3339 time, extension attribute names,
//!   content type) and requires `time` to be present.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validators::{self, ValidationIssue};

/// The only CloudEvents spec version this crate produces or accepts.
pub const SPEC_VERSION: &str = "1.0";

/// Default `datacontenttype` for events carrying structured JSON data.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// How thoroughly [`CloudEvent::validate`] checks an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Required attributes only.
    #[default]
    Lax,
    /// Required attributes plus format checks on every populated attribute.
    Strict,
}

/// Optional attributes applied at construction time.
///
/// `time` of `None` means "stamp with the current instant"; pass an explicit
/// value for replay or deterministic tests.
#[derive(Debug, Clone)]
pub struct EventOptions {
    pub time: Option<DateTime<Utc>>,
    pub datacontenttype: Option<String>,
    pub dataschema: Option<String>,
    pub subject: Option<String>,
    /// When set, emitters validate in [`ValidationMode::Strict`] before
    /// forwarding an event.
    pub strict: bool,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            time: None,
            datacontenttype: Some(CONTENT_TYPE_JSON.to_string()),
            dataschema: None,
            subject: None,
            strict: false,
        }
    }
}

/// A CloudEvents v1.0 envelope in the JSON event format.
///
/// Field names follow the canonical lowercase attribute names, so a serde
/// round trip is the JSON format ("structured content mode") as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// Event identifier, unique within the `source`.
    pub id: String,
    /// Event type, namespaced reverse-DNS style, e.g. `com.example.api.onRequest`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// URI-reference identifying the event producer.
    pub source: String,
    /// Always [`SPEC_VERSION`] for events built by this crate.
    pub specversion: String,
    /// Free-form domain payload. Shape is owned by the producer, never by
    /// this crate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Extension context attributes, flattened next to the core attributes.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl CloudEvent {
    /// Build an event with the given required attributes and the optional
    /// attributes from `opts`.
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: Option<Value>,
        opts: &EventOptions,
    ) -> Self {
        CloudEvent {
            id: id.into(),
            event_type: event_type.into(),
            source: source.into(),
            specversion: SPEC_VERSION.to_string(),
            data,
            datacontenttype: opts.datacontenttype.clone(),
            dataschema: opts.dataschema.clone(),
            subject: opts.subject.clone(),
            time: Some(opts.time.unwrap_or_else(Utc::now)),
            extensions: BTreeMap::new(),
        }
    }

    /// Attach an extension context attribute. The name is validated lazily,
    /// by [`CloudEvent::validate`] in strict mode.
    pub fn with_extension(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    /// Whether `data` should be treated as structured JSON.
    pub fn has_json_data(&self) -> bool {
        self.data.is_some()
            && self
                .datacontenttype
                .as_deref()
                .map(|ct| ct.starts_with(CONTENT_TYPE_JSON))
                .unwrap_or(true)
    }

    /// Check the event against the attribute rules, collecting every issue.
    pub fn validate(&self, mode: ValidationMode) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if let Err(issue) = validators::ensure_string_not_empty("id", &self.id) {
            issues.push(issue);
        }
        if let Err(issue) = validators::ensure_string_not_empty("type", &self.event_type) {
            issues.push(issue);
        }
        if let Err(issue) = validators::ensure_string_not_empty("source", &self.source) {
            issues.push(issue);
        }
        if let Err(issue) = validators::ensure_spec_version("specversion", &self.specversion) {
            issues.push(issue);
        }

        if mode == ValidationMode::Lax {
            return issues;
        }

        if let Err(issue) = validators::ensure_uri_reference("source", &self.source) {
            issues.push(issue);
        }
        if self.time.is_none() {
            issues.push(ValidationIssue::new("time", "missing", "required in strict mode"));
        }
        if let Some(ct) = &self.datacontenttype {
            if let Err(issue) = validators::ensure_content_type("datacontenttype", ct) {
                issues.push(issue);
            }
        }
        if let Some(ds) = &self.dataschema {
            if let Err(issue) = validators::ensure_uri_reference("dataschema", ds) {
                issues.push(issue);
            }
        }
        if let Some(subject) = &self.subject {
            if let Err(issue) = validators::ensure_string_not_empty("subject", subject) {
                issues.push(issue);
            }
        }
        for name in self.extensions.keys() {
            if let Err(mut issue) = validators::ensure_extension_name("extensions", name) {
                issue.location = format!("extensions.{name}");
                issues.push(issue);
            }
        }

        issues
    }

    /// Boolean shorthand for [`CloudEvent::validate`].
    pub fn is_valid(&self, mode: ValidationMode) -> bool {
        self.validate(mode).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CloudEvent {
        CloudEvent::new(
            "1",
            "com.example.api.onRequest",
            "http://localhost:3000/orders",
            Some(json!({"request": {"method": "GET"}})),
            &EventOptions::default(),
        )
    }

    #[test]
    fn test_new_sets_spec_version_and_time() {
        let ev = sample();
        assert_eq!(ev.specversion, SPEC_VERSION);
        assert!(ev.time.is_some());
        assert_eq!(ev.datacontenttype.as_deref(), Some(CONTENT_TYPE_JSON));
    }

    #[test]
    fn test_valid_event_passes_both_modes() {
        let ev = sample();
        assert!(ev.is_valid(ValidationMode::Lax));
        assert!(ev.is_valid(ValidationMode::Strict));
    }

    #[test]
    fn test_missing_required_attributes_reported() {
        let mut ev = sample();
        ev.id = String::new();
        ev.source = String::new();
        let issues = ev.validate(ValidationMode::Lax);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind == "missing"));
    }

    #[test]
    fn test_strict_mode_checks_extension_names() {
        let ev = sample().with_extension("Not-Valid", json!("x"));
        assert!(ev.is_valid(ValidationMode::Lax));
        let issues = ev.validate(ValidationMode::Strict);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location, "extensions.Not-Valid");
    }

    #[test]
    fn test_serde_uses_canonical_attribute_names() {
        let ev = sample().with_extension("traceid", json!("abc"));
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["type"], "com.example.api.onRequest");
        assert_eq!(value["specversion"], "1.0");
        assert_eq!(value["traceid"], "abc");
        assert!(value.get("event_type").is_none());

        let back: CloudEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, ev);
    }
}
