//! # Lifecycle Hooks Module
//!
//! The hook-to-event mapping: one emit method per lifecycle point of the
//! host HTTP service, each producing a CloudEvent and handing it to the
//! configured callback.
//!
//! ## Mapping
//!
//! Event `type` is always `{base_namespace}.{hook}`; the payload shape per
//! hook is:
//!
//! | Hook | Payload |
//! |---|---|
//! | `onRequest`, `onRequestAbort` | request summary |
//! | `preParsing`, `preValidation`, `preHandler` | request + reply |
//! | `preSerialization`, `onSend` | request + reply + handler payload |
//! | `onResponse`, `onTimeout` | request + reply |
//! | `onError` | request + reply + error + process info |
//! | `onReady`, `onListen`, `onClose`, `onRegister` | plugin metadata |
//! | `onRoute` | raw route registration options |
//!
//! ## Determinism
//!
//! For a fixed configuration and fixed hook inputs, `type`, `source` and the
//! payload are pure functions of the inputs. The only advancing state is the
//! id generator; `time` is stamped at emission.
//!
//! ## Callback safety
//!
//! The callback is infallible by type; the host request path never sees an
//! error from event delivery. In strict mode an event that fails validation
//! is logged and withheld instead of being forwarded.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::builder::{self, PayloadFlags, ReplyInfo, RequestInfo, RouteOptions, SourceMode};
use crate::event::{CloudEvent, EventOptions, ValidationMode};
use crate::ids::IdGenerator;

/// Every lifecycle hook the emitter understands, in request order followed
/// by the server-level hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    OnRequest,
    PreParsing,
    PreValidation,
    PreHandler,
    PreSerialization,
    OnError,
    OnSend,
    OnResponse,
    OnTimeout,
    OnRequestAbort,
    OnReady,
    OnListen,
    OnClose,
    OnRegister,
    OnRoute,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 15] = [
        LifecycleHook::OnRequest,
        LifecycleHook::PreParsing,
        LifecycleHook::PreValidation,
        LifecycleHook::PreHandler,
        LifecycleHook::PreSerialization,
        LifecycleHook::OnError,
        LifecycleHook::OnSend,
        LifecycleHook::OnResponse,
        LifecycleHook::OnTimeout,
        LifecycleHook::OnRequestAbort,
        LifecycleHook::OnReady,
        LifecycleHook::OnListen,
        LifecycleHook::OnClose,
        LifecycleHook::OnRegister,
        LifecycleHook::OnRoute,
    ];

    /// The event type suffix for this hook.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleHook::OnRequest => "onRequest",
            LifecycleHook::PreParsing => "preParsing",
            LifecycleHook::PreValidation => "preValidation",
            LifecycleHook::PreHandler => "preHandler",
            LifecycleHook::PreSerialization => "preSerialization",
            LifecycleHook::OnError => "onError",
            LifecycleHook::OnSend => "onSend",
            LifecycleHook::OnResponse => "onResponse",
            LifecycleHook::OnTimeout => "onTimeout",
            LifecycleHook::OnRequestAbort => "onRequestAbort",
            LifecycleHook::OnReady => "onReady",
            LifecycleHook::OnListen => "onListen",
            LifecycleHook::OnClose => "onClose",
            LifecycleHook::OnRegister => "onRegister",
            LifecycleHook::OnRoute => "onRoute",
        }
    }

    /// Whether this hook carries request-scoped data (and therefore a
    /// request URL for the source computation).
    pub fn is_request_scoped(&self) -> bool {
        !matches!(
            self,
            LifecycleHook::OnReady
                | LifecycleHook::OnListen
                | LifecycleHook::OnClose
                | LifecycleHook::OnRegister
                | LifecycleHook::OnRoute
        )
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver for every emitted event.
pub type EventCallback = Arc<dyn Fn(CloudEvent) + Send + Sync>;

/// Emits one CloudEvent per lifecycle hook invocation.
///
/// Built by the plugin; hosts call the per-hook methods at the matching
/// points of their request lifecycle.
pub struct HookEmitter {
    base_namespace: String,
    server_url: Url,
    source_mode: SourceMode,
    flags: PayloadFlags,
    event_options: EventOptions,
    extensions: std::collections::BTreeMap<String, Value>,
    id_generator: Arc<dyn IdGenerator>,
    callback: EventCallback,
    started: Instant,
}

impl HookEmitter {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        base_namespace: String,
        server_url: Url,
        source_mode: SourceMode,
        flags: PayloadFlags,
        event_options: EventOptions,
        extensions: std::collections::BTreeMap<String, Value>,
        id_generator: Arc<dyn IdGenerator>,
        callback: EventCallback,
    ) -> Self {
        Self {
            base_namespace,
            server_url,
            source_mode,
            flags,
            event_options,
            extensions,
            id_generator,
            callback,
            started: Instant::now(),
        }
    }

    /// Build and deliver one event. `payload` receives the event id and
    /// timestamp so redundant-attribute merging sees the same values the
    /// envelope carries.
    fn emit<F>(&self, hook: LifecycleHook, request_url: Option<&str>, payload: F)
    where
        F: FnOnce(&str, &chrono::DateTime<Utc>) -> Value,
    {
        let id = self.id_generator.next_id();
        let time = self.event_options.time.unwrap_or_else(Utc::now);
        let data = payload(&id, &time);

        let event_type = format!("{}.{}", self.base_namespace, hook.name());
        let source = builder::source_url(self.source_mode, &self.server_url, request_url);

        let opts = EventOptions {
            time: Some(time),
            ..self.event_options.clone()
        };
        let mut event = CloudEvent::new(id, event_type, source, Some(data), &opts);
        event.extensions = self.extensions.clone();

        if self.event_options.strict {
            let issues = event.validate(ValidationMode::Strict);
            if !issues.is_empty() {
                warn!(
                    hook = %hook,
                    event_id = %event.id,
                    issues = %crate::validators::format_issues(&issues),
                    "withholding invalid event in strict mode"
                );
                return;
            }
        }

        (self.callback)(event);
    }

    pub fn on_request(&self, req: &RequestInfo) {
        self.emit(LifecycleHook::OnRequest, Some(&req.url), |id, time| {
            builder::request_payload(req, &self.flags, id, time)
        });
    }

    pub fn on_request_abort(&self, req: &RequestInfo) {
        self.emit(LifecycleHook::OnRequestAbort, Some(&req.url), |id, time| {
            builder::request_payload(req, &self.flags, id, time)
        });
    }

    pub fn pre_parsing(&self, req: &RequestInfo, reply: &ReplyInfo) {
        self.emit(LifecycleHook::PreParsing, Some(&req.url), |id, time| {
            builder::request_reply_payload(req, reply, &self.flags, id, time)
        });
    }

    pub fn pre_validation(&self, req: &RequestInfo, reply: &ReplyInfo) {
        self.emit(LifecycleHook::PreValidation, Some(&req.url), |id, time| {
            builder::request_reply_payload(req, reply, &self.flags, id, time)
        });
    }

    pub fn pre_handler(&self, req: &RequestInfo, reply: &ReplyInfo) {
        self.emit(LifecycleHook::PreHandler, Some(&req.url), |id, time| {
            builder::request_reply_payload(req, reply, &self.flags, id, time)
        });
    }

    pub fn pre_serialization(&self, req: &RequestInfo, reply: &ReplyInfo, payload: &Value) {
        self.emit(LifecycleHook::PreSerialization, Some(&req.url), |id, time| {
            builder::request_reply_body_payload(req, reply, payload, &self.flags, id, time)
        });
    }

    pub fn on_send(&self, req: &RequestInfo, reply: &ReplyInfo, payload: &Value) {
        self.emit(LifecycleHook::OnSend, Some(&req.url), |id, time| {
            builder::request_reply_body_payload(req, reply, payload, &self.flags, id, time)
        });
    }

    pub fn on_response(&self, req: &RequestInfo, reply: &ReplyInfo) {
        self.emit(LifecycleHook::OnResponse, Some(&req.url), |id, time| {
            builder::request_reply_payload(req, reply, &self.flags, id, time)
        });
    }

    pub fn on_timeout(&self, req: &RequestInfo, reply: &ReplyInfo) {
        self.emit(LifecycleHook::OnTimeout, Some(&req.url), |id, time| {
            builder::request_reply_payload(req, reply, &self.flags, id, time)
        });
    }

    pub fn on_error(
        &self,
        req: &RequestInfo,
        reply: &ReplyInfo,
        err: &(dyn std::error::Error + 'static),
    ) {
        let uptime = self.started.elapsed();
        self.emit(LifecycleHook::OnError, Some(&req.url), |id, time| {
            builder::error_payload(req, reply, err, uptime, &self.flags, id, time)
        });
    }

    pub fn on_ready(&self) {
        self.emit(LifecycleHook::OnReady, None, |_, time| {
            builder::plugin_metadata_payload(time)
        });
    }

    pub fn on_listen(&self) {
        self.emit(LifecycleHook::OnListen, None, |_, time| {
            builder::plugin_metadata_payload(time)
        });
    }

    pub fn on_close(&self) {
        self.emit(LifecycleHook::OnClose, None, |_, time| {
            builder::plugin_metadata_payload(time)
        });
    }

    pub fn on_register(&self) {
        self.emit(LifecycleHook::OnRegister, None, |_, time| {
            builder::plugin_metadata_payload(time)
        });
    }

    pub fn on_route(&self, route: &RouteOptions) {
        match serde_json::to_value(route) {
            Ok(data) => self.emit(LifecycleHook::OnRoute, None, |_, _| data),
            Err(e) => warn!(error = %e, "failed to encode route options, skipping onRoute event"),
        }
    }
}

impl fmt::Debug for HookEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEmitter")
            .field("base_namespace", &self.base_namespace)
            .field("server_url", &self.server_url.as_str())
            .field("source_mode", &self.source_mode)
            .field("flags", &self.flags)
            .finish()
    }
}
