//! Transformer utilities: shaping errors, process info and timestamps into
//! event payload fragments.
//!
//! These are the data-shaping helpers the plugin re-exposes to hosts
//! alongside the event constructor, so applications can build their own
//! payloads with the same conventions the hook emitters use.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// Structured rendering of an error and its source chain.
///
/// The top-level message comes first; `chain` holds each `source()` message
/// in order, outermost to innermost.
pub fn error_to_data(err: &(dyn std::error::Error + 'static)) -> Value {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    json!({
        "message": err.to_string(),
        "chain": chain,
    })
}

/// [`error_to_data`] plus an HTTP status classification, for hook payloads
/// where the reply status is already decided.
pub fn error_to_data_with_status(
    err: &(dyn std::error::Error + 'static),
    status: http::StatusCode,
) -> Value {
    let mut data = error_to_data(err);
    if let Some(obj) = data.as_object_mut() {
        obj.insert("status".to_string(), json!(status.as_u16()));
    }
    data
}

/// Process-level diagnostics for error payloads: pid, uptime and memory.
///
/// `uptime` is measured by the caller (the emitter tracks its own start
/// instant). Memory figures are best-effort; platforms without support
/// report null.
pub fn process_info_to_data(uptime: Duration) -> Value {
    let mem = memory_stats::memory_stats();
    json!({
        "pid": std::process::id(),
        "uptime_ms": uptime.as_millis() as u64,
        "physical_mem": mem.map(|m| m.physical_mem),
        "virtual_mem": mem.map(|m| m.virtual_mem),
    })
}

/// RFC 3339 rendering with millisecond precision, UTC designator `Z`.
pub fn timestamp_to_string(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn timestamp_from_string(value: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("`{value}` is not an RFC 3339 timestamp"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Strip the query string and fragment from a request URL, keeping the path.
pub fn uri_strip_query(url: &str) -> &str {
    match url.find(['?', '#']) {
        Some(pos) => &url[..pos],
        None => url,
    }
}

/// Compact one-line rendering of a JSON value for log fields.
pub fn dump_object(name: &str, value: &Value) -> String {
    format!("{name}:{value}")
}
