//! # Event Schema Module
//!
//! The CloudEvents v1.0 JSON Schema, embedded, plus the compile-once fast
//! validator built from it.
//!
//! ## Overview
//!
//! JSON Schema validators are expensive to compile. The plugin therefore
//! compiles the event schema exactly once at setup and shares the compiled
//! validator behind an `Arc` with every hook invocation and with the fast
//! serializer. There is deliberately no per-call compilation path.
//!
//! ## The strict schema
//!
//! [`strict_event_schema`] is the embedded schema with the free-form `data`
//! property removed. The fast path never inspects `data` (its shape belongs
//! to the host application), so the compiled validator only covers the
//! envelope attributes.
//!
//! ## Fingerprinting
//!
//! Each compiled schema carries a [`SchemaVersion`]: a version counter plus
//! the first 16 hex chars of the SHA-256 of the canonical schema text. The
//! fingerprint is logged at setup and exposed on the plugin so operators can
//! tell which schema build produced a given event stream.

use std::sync::Arc;

use anyhow::Context;
use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::validators::ValidationIssue;

static EVENT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": "https://raw.githubusercontent.com/cloudevents/spec/v1.0/spec.json",
        "title": "CloudEvents v1.0 JSON format",
        "type": "object",
        "properties": {
            "id": {
                "type": "string",
                "minLength": 1
            },
            "type": {
                "type": "string",
                "minLength": 1
            },
            "source": {
                "type": "string",
                "format": "uri-reference",
                "minLength": 1
            },
            "specversion": {
                "type": "string",
                "enum": ["1.0"]
            },
            "data": {},
            "datacontenttype": {
                "type": ["string", "null"],
                "minLength": 1
            },
            "dataschema": {
                "type": ["string", "null"],
                "format": "uri",
                "minLength": 1
            },
            "subject": {
                "type": ["string", "null"],
                "minLength": 1
            },
            "time": {
                "type": ["string", "null"],
                "format": "date-time"
            }
        },
        "required": ["id", "type", "source", "specversion"]
    })
});

/// The full embedded CloudEvents v1.0 JSON Schema.
pub fn event_schema() -> &'static Value {
    &EVENT_SCHEMA
}

/// The embedded schema minus the free-form `data` property.
///
/// This is the document the plugin compiles: `data` carries host-defined
/// JSON and is excluded from envelope validation.
pub fn strict_event_schema() -> Value {
    let mut schema = EVENT_SCHEMA.clone();
    if let Some(properties) = schema
        .get_mut("properties")
        .and_then(Value::as_object_mut)
    {
        properties.remove("data");
    }
    schema
}

/// Version identifier for a compiled schema.
///
/// Combines a monotonic version counter with a content hash so a schema
/// build can be identified from logs alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
    /// Monotonic version counter.
    pub version: u64,
    /// Content hash of the schema (first 16 chars of SHA-256).
    pub hash: String,
}

impl SchemaVersion {
    pub fn new(version: u64, hash: impl Into<String>) -> Self {
        Self {
            version,
            hash: hash.into(),
        }
    }

    /// Compute a version from raw schema content.
    pub fn from_content(version: u64, content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();
        let hash = digest
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()
            .chars()
            .take(16)
            .collect::<String>();
        Self { version, hash }
    }
}

/// A JSON Schema compiled once and shared for the lifetime of the plugin.
pub struct CompiledSchema {
    compiled: Arc<Validator>,
    version: SchemaVersion,
}

impl CompiledSchema {
    /// Compile `schema`. Fails with a descriptive error when the document is
    /// not a valid JSON Schema; this is a setup error, never a per-event one.
    pub fn compile(schema: &Value) -> anyhow::Result<Self> {
        let compiled = validator_for(schema)
            .map_err(|e| anyhow::anyhow!("failed to compile event schema: {e}"))?;
        let canonical =
            serde_json::to_string(schema).context("failed to canonicalize event schema")?;
        let version = SchemaVersion::from_content(1, &canonical);
        debug!(
            schema_version = version.version,
            schema_hash = %version.hash,
            "compiled event schema"
        );
        Ok(Self {
            compiled: Arc::new(compiled),
            version,
        })
    }

    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    /// Validate a JSON instance, mapping schema errors into the crate's
    /// issue report shape.
    pub fn validate_value(&self, instance: &Value) -> Vec<ValidationIssue> {
        self.compiled
            .iter_errors(instance)
            .map(|e| ValidationIssue::new(e.instance_path().to_string(), "schema", e.to_string()))
            .collect()
    }

    pub fn is_valid_value(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("version", &self.version)
            .finish()
    }
}
