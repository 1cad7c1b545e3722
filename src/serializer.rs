//! Fast, schema-backed event serialization.
//!
//! The "fast" path is the typed serde one: the envelope layout is fixed at
//! compile time by the [`CloudEvent`] type, so serialization never consults
//! the schema. The compiled schema comes in only when the caller asks for
//! `only_valid`, to refuse events the envelope rules reject.

use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::debug;

use crate::event::CloudEvent;
use crate::schema::CompiledSchema;
use crate::validators::{format_issues, ValidationIssue};

/// Options for checked serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// Refuse to serialize an event whose envelope fails schema validation.
    pub only_valid: bool,
    /// Log each serialized event id at debug level.
    pub log_events: bool,
}

/// Serializer specialized for the plugin's compiled event schema.
#[derive(Debug, Clone)]
pub struct FastSerializer {
    schema: Arc<CompiledSchema>,
}

impl FastSerializer {
    pub fn new(schema: Arc<CompiledSchema>) -> Self {
        Self { schema }
    }

    /// Serialize an event to the CloudEvents JSON format.
    pub fn serialize(&self, event: &CloudEvent) -> anyhow::Result<String> {
        serde_json::to_string(event)
            .with_context(|| format!("failed to serialize event `{}`", event.id))
    }

    /// Serialize with [`SerializeOptions`] applied.
    pub fn serialize_checked(
        &self,
        event: &CloudEvent,
        opts: &SerializeOptions,
    ) -> anyhow::Result<String> {
        if opts.only_valid {
            let issues = self.validate_event(event)?;
            if !issues.is_empty() {
                bail!(
                    "refusing to serialize invalid event `{}`: {}",
                    event.id,
                    format_issues(&issues)
                );
            }
        }
        let text = self.serialize(event)?;
        if opts.log_events {
            debug!(event_id = %event.id, event_type = %event.event_type, bytes = text.len(), "serialized event");
        }
        Ok(text)
    }

    /// Serialize a batch as a JSON array, applying the same options to every
    /// member.
    pub fn serialize_batch(
        &self,
        events: &[CloudEvent],
        opts: &SerializeOptions,
    ) -> anyhow::Result<String> {
        if opts.only_valid {
            for event in events {
                let issues = self.validate_event(event)?;
                if !issues.is_empty() {
                    bail!(
                        "refusing to serialize batch, event `{}` is invalid: {}",
                        event.id,
                        format_issues(&issues)
                    );
                }
            }
        }
        serde_json::to_string(events).context("failed to serialize event batch")
    }

    /// Validate the event's envelope against the compiled schema.
    pub fn validate_event(&self, event: &CloudEvent) -> anyhow::Result<Vec<ValidationIssue>> {
        let instance = self.event_to_value(event)?;
        Ok(self.schema.validate_value(&instance))
    }

    /// Boolean shorthand for [`FastSerializer::validate_event`]; a
    /// non-serializable event counts as invalid.
    pub fn is_valid_event(&self, event: &CloudEvent) -> bool {
        self.event_to_value(event)
            .map(|v| self.schema.is_valid_value(&v))
            .unwrap_or(false)
    }

    fn event_to_value(&self, event: &CloudEvent) -> anyhow::Result<Value> {
        serde_json::to_value(event)
            .with_context(|| format!("failed to encode event `{}` for validation", event.id))
    }
}
