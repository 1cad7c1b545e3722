//! CloudEvents JSON Batch support.
//!
//! A batch is a JSON array of events in the structured JSON format. Reading
//! a batch can either fail on the first bad entry or, with `only_valid`,
//! keep the good events and drop the rest.

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::warn;

use crate::event::{CloudEvent, ValidationMode};

/// Options for reading a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Drop malformed entries and events that fail validation instead of
    /// failing the whole batch.
    pub only_valid: bool,
    /// Validation mode applied when `only_valid` is set.
    pub mode: ValidationMode,
}

/// The JSON Batch utility the plugin exposes.
pub struct JsonBatch;

impl JsonBatch {
    /// Whether a JSON value has the batch shape.
    pub fn is_batch(value: &Value) -> bool {
        value.is_array()
    }

    /// Render events as the batch JSON value.
    pub fn to_value(events: &[CloudEvent]) -> anyhow::Result<Value> {
        serde_json::to_value(events).context("failed to encode event batch")
    }

    /// Serialize events as a batch JSON string.
    pub fn serialize(events: &[CloudEvent]) -> anyhow::Result<String> {
        serde_json::to_string(events).context("failed to serialize event batch")
    }

    /// Read events out of a batch value.
    ///
    /// Without `only_valid`, the first malformed entry fails the batch.
    /// With it, malformed entries and invalid events are dropped with a
    /// warning and the rest are returned.
    pub fn from_value(value: &Value, opts: &BatchOptions) -> anyhow::Result<Vec<CloudEvent>> {
        let Some(entries) = value.as_array() else {
            bail!("not a JSON batch: expected an array");
        };

        let mut events = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match serde_json::from_value::<CloudEvent>(entry.clone()) {
                Ok(event) => {
                    if opts.only_valid && !event.is_valid(opts.mode) {
                        warn!(index, event_id = %event.id, "dropping invalid event from batch");
                        continue;
                    }
                    events.push(event);
                }
                Err(e) => {
                    if opts.only_valid {
                        warn!(index, error = %e, "dropping malformed batch entry");
                        continue;
                    }
                    return Err(e).with_context(|| format!("malformed batch entry at index {index}"));
                }
            }
        }
        Ok(events)
    }

    /// Parse a batch from its JSON text form.
    pub fn deserialize(text: &str, opts: &BatchOptions) -> anyhow::Result<Vec<CloudEvent>> {
        let value: Value = serde_json::from_str(text).context("batch is not valid JSON")?;
        Self::from_value(&value, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventOptions;
    use serde_json::json;

    fn event(id: &str) -> CloudEvent {
        CloudEvent::new(
            id,
            "com.example.api.onRequest",
            "/orders",
            None,
            &EventOptions::default(),
        )
    }

    #[test]
    fn test_round_trip() {
        let events = vec![event("1"), event("2")];
        let value = JsonBatch::to_value(&events).unwrap();
        assert!(JsonBatch::is_batch(&value));
        let back = JsonBatch::from_value(&value, &BatchOptions::default()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].id, "2");
    }

    #[test]
    fn test_strictness_of_default_read() {
        let value = json!([{"id": "1"}, "not an object"]);
        let err = JsonBatch::from_value(&value, &BatchOptions::default()).unwrap_err();
        assert!(err.to_string().contains("index 0"));
    }

    #[test]
    fn test_only_valid_filters() {
        let mut bad = event("bad");
        bad.source = String::new();
        let mut value = JsonBatch::to_value(&vec![event("1"), bad, event("3")]).unwrap();
        value.as_array_mut().unwrap().push(json!(42));

        let opts = BatchOptions {
            only_valid: true,
            mode: ValidationMode::Lax,
        };
        let events = JsonBatch::from_value(&value, &opts).unwrap();
        assert_eq!(
            events.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "3"]
        );
    }

    #[test]
    fn test_not_an_array_fails() {
        assert!(JsonBatch::from_value(&json!({"id": "1"}), &BatchOptions::default()).is_err());
    }
}
