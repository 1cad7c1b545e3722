//! # Payload Builder Module
//!
//! Pure data shaping: hook-local request/reply/error information in, the
//! JSON object placed in a CloudEvent's `data` attribute out, plus the
//! `source` attribute computation.
//!
//! Everything here is deterministic: for fixed inputs and fixed flags, the
//! same payload comes out. No clocks, ids or hidden state; those belong to
//! the emitter.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use smallvec::SmallVec;
use url::Url;

use crate::transformer;

/// Inline header storage for the hook hot path; spills to the heap past 8.
pub type HeaderVec = SmallVec<[(String, String); 8]>;

/// Request-scoped facts a host hands to the emitter.
///
/// Only `method` and `url` are required; everything else is attached when
/// the host has it.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Host-assigned request id, if any.
    pub request_id: Option<String>,
    pub method: http::Method,
    /// Path plus query string, as received.
    pub url: String,
    /// Matched route pattern, e.g. `/orders/{id}`.
    pub route: Option<String>,
    pub headers: HeaderVec,
    pub query_params: Vec<(String, String)>,
    pub hostname: Option<String>,
    pub remote_addr: Option<String>,
    /// `1.1`, `2`, ... Attached to payloads only with `include_http_attributes`.
    pub http_version: Option<String>,
    /// Pre-rewrite URL. Attached only with `include_http_attributes`.
    pub original_url: Option<String>,
    /// Upgrade target (e.g. `websocket`). Attached only with `include_http_attributes`.
    pub upgrade: Option<String>,
}

impl RequestInfo {
    pub fn new(method: http::Method, url: impl Into<String>) -> Self {
        Self {
            request_id: None,
            method,
            url: url.into(),
            route: None,
            headers: HeaderVec::new(),
            query_params: Vec::new(),
            hostname: None,
            remote_addr: None,
            http_version: None,
            original_url: None,
            upgrade: None,
        }
    }
}

/// Reply-scoped facts a host hands to the emitter.
#[derive(Debug, Clone)]
pub struct ReplyInfo {
    pub status: http::StatusCode,
    /// Whether the reply has already gone out on the wire.
    pub sent: bool,
    pub elapsed: Option<Duration>,
}

impl ReplyInfo {
    pub fn new(status: http::StatusCode) -> Self {
        Self {
            status,
            sent: false,
            elapsed: None,
        }
    }
}

/// Raw route registration record, forwarded untouched as the `onRoute`
/// payload.
#[derive(Debug, Clone, Serialize)]
pub struct RouteOptions {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_name: Option<String>,
    /// Anything else the host records about the route.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub config: Value,
}

/// Which optional pieces get merged into hook payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadFlags {
    pub include_headers: bool,
    pub include_http_attributes: bool,
    pub include_redundant_attributes: bool,
}

/// The request block of a hook payload.
#[derive(Debug, Serialize)]
pub struct RequestSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<String>,
}

/// The reply block of a hook payload.
#[derive(Debug, Serialize)]
pub struct ReplySummary {
    pub status_code: u16,
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

pub fn request_summary(req: &RequestInfo, flags: &PayloadFlags) -> RequestSummary {
    let headers = if flags.include_headers {
        Some(
            req.headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        )
    } else {
        None
    };
    let (http_version, original_url, upgrade) = if flags.include_http_attributes {
        (
            req.http_version.clone(),
            req.original_url.clone(),
            req.upgrade.clone(),
        )
    } else {
        (None, None, None)
    };
    RequestSummary {
        id: req.request_id.clone(),
        method: req.method.to_string(),
        url: req.url.clone(),
        route: req.route.clone(),
        headers,
        query: req.query_params.iter().cloned().collect(),
        hostname: req.hostname.clone(),
        remote_addr: req.remote_addr.clone(),
        http_version,
        original_url,
        upgrade,
    }
}

pub fn reply_summary(reply: &ReplyInfo) -> ReplySummary {
    ReplySummary {
        status_code: reply.status.as_u16(),
        sent: reply.sent,
        elapsed_ms: reply.elapsed.map(|d| d.as_millis() as u64),
    }
}

fn finish(mut payload: Value, flags: &PayloadFlags, id: &str, time: &DateTime<Utc>) -> Value {
    if flags.include_redundant_attributes {
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("id".to_string(), json!(id));
            obj.insert(
                "timestamp".to_string(),
                json!(transformer::timestamp_to_string(time)),
            );
        }
    }
    payload
}

/// Payload for `onRequest` and `onRequestAbort`.
pub fn request_payload(
    req: &RequestInfo,
    flags: &PayloadFlags,
    id: &str,
    time: &DateTime<Utc>,
) -> Value {
    finish(
        json!({ "request": request_summary(req, flags) }),
        flags,
        id,
        time,
    )
}

/// Payload for `preParsing`, `preValidation`, `preHandler`, `onResponse` and
/// `onTimeout`.
pub fn request_reply_payload(
    req: &RequestInfo,
    reply: &ReplyInfo,
    flags: &PayloadFlags,
    id: &str,
    time: &DateTime<Utc>,
) -> Value {
    finish(
        json!({
            "request": request_summary(req, flags),
            "reply": reply_summary(reply),
        }),
        flags,
        id,
        time,
    )
}

/// Payload for `preSerialization` and `onSend`: request, reply and the
/// handler payload in flight.
pub fn request_reply_body_payload(
    req: &RequestInfo,
    reply: &ReplyInfo,
    body: &Value,
    flags: &PayloadFlags,
    id: &str,
    time: &DateTime<Utc>,
) -> Value {
    finish(
        json!({
            "request": request_summary(req, flags),
            "reply": reply_summary(reply),
            "payload": body,
        }),
        flags,
        id,
        time,
    )
}

/// Payload for `onError`: request, reply, structured error, process info.
pub fn error_payload(
    req: &RequestInfo,
    reply: &ReplyInfo,
    err: &(dyn std::error::Error + 'static),
    uptime: Duration,
    flags: &PayloadFlags,
    id: &str,
    time: &DateTime<Utc>,
) -> Value {
    finish(
        json!({
            "request": request_summary(req, flags),
            "reply": reply_summary(reply),
            "error": transformer::error_to_data_with_status(err, reply.status),
            "process": transformer::process_info_to_data(uptime),
        }),
        flags,
        id,
        time,
    )
}

/// Payload for server-level hooks (`onReady`, `onListen`, `onClose`,
/// `onRegister`): plugin metadata only.
pub fn plugin_metadata_payload(time: &DateTime<Utc>) -> Value {
    json!({
        "timestamp": transformer::timestamp_to_string(time),
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
    })
}

/// How the `source` attribute is computed for request-scoped events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Plugin base URL only.
    ServerUrl,
    /// Base URL + request path with the query string stripped.
    #[default]
    ServerUrlAndPath,
    /// Base URL + full original request path, query included.
    ServerUrlAndFullPath,
    /// Request path only, no base.
    RequestPath,
}

impl std::str::FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server-url" => Ok(SourceMode::ServerUrl),
            "server-url-and-path" => Ok(SourceMode::ServerUrlAndPath),
            "server-url-and-full-path" => Ok(SourceMode::ServerUrlAndFullPath),
            "request-path" => Ok(SourceMode::RequestPath),
            other => Err(format!("unknown source mode `{other}`")),
        }
    }
}

fn join_base(base: &Url, path: &str) -> String {
    let mut root = base.to_string();
    while root.ends_with('/') {
        root.pop();
    }
    if path.is_empty() {
        return root;
    }
    if path.starts_with('/') {
        format!("{root}{path}")
    } else {
        format!("{root}/{path}")
    }
}

/// Compute the event `source` for a request-scoped hook.
///
/// Non-request hooks pass `request_url: None` and always get the base URL,
/// whatever the mode.
pub fn source_url(mode: SourceMode, base: &Url, request_url: Option<&str>) -> String {
    let Some(request_url) = request_url else {
        return join_base(base, "");
    };
    match mode {
        SourceMode::ServerUrl => join_base(base, ""),
        SourceMode::ServerUrlAndPath => {
            join_base(base, transformer::uri_strip_query(request_url))
        }
        SourceMode::ServerUrlAndFullPath => join_base(base, request_url),
        SourceMode::RequestPath => {
            let path = transformer::uri_strip_query(request_url);
            if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            }
        }
    }
}
