//! # cloudhooks
//!
//! **cloudhooks** instruments an HTTP service's request/response lifecycle
//! with [CloudEvents](https://cloudevents.io) v1.0 envelopes.
//!
//! ## Overview
//!
//! A host application builds a [`CloudEventsPlugin`] once at startup. The
//! plugin validates its configuration, compiles the CloudEvents JSON Schema
//! (envelope only, the free-form `data` field excluded) exactly once into a
//! fast validator, and exposes two things:
//!
//! - a [`HookEmitter`](hooks::HookEmitter) with one method per lifecycle
//!   hook (`onRequest`, `preHandler`, `onError`, `onResponse`, `onClose`,
//!   ...); each call shapes the hook-local request/reply/error data into a
//!   deterministic CloudEvent and forwards it to the configured callback,
//! - the CloudEvents utility surface a host decorates itself with: the
//!   event constructor, transformer helpers, the JSON batch utility, and
//!   the schema-compiled fast serialize/validate functions.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`plugin`]** - Entry point: option validation, schema compilation, wiring
//! - **[`hooks`]** - Hook-to-event mapping and the per-hook emitters
//! - **[`builder`]** - Payload shaping and `source` URL computation
//! - **[`event`]** - The minimal CloudEvents v1.0 envelope model
//! - **[`schema`]** - Embedded event schema and the compile-once validator
//! - **[`serializer`]** - Schema-backed fast serialization
//! - **[`transformer`]** - Error/process/timestamp shaping helpers
//! - **[`batch`]** - CloudEvents JSON Batch support
//! - **[`ids`]** - Monotonic and ULID event id generators
//! - **[`validators`]** - Predicate/assertion helpers and issue reporting
//! - **[`runtime_config`]** - `CLOUDHOOKS_*` environment overrides
//!
//! ## Quick Start
//!
//! ```
//! use cloudhooks::{CloudEventsPlugin, PluginOptions, ReplyInfo, RequestInfo};
//! use http::{Method, StatusCode};
//!
//! let plugin = CloudEventsPlugin::new(PluginOptions::default()).expect("valid options");
//!
//! // At the host's lifecycle points:
//! let req = RequestInfo::new(Method::GET, "/orders/42?verbose=1");
//! plugin.hooks().on_request(&req);
//! plugin.hooks().on_response(&req, &ReplyInfo::new(StatusCode::OK));
//! ```
//!
//! Every event's `type` is `{base_namespace}.{hook}`, its `source` follows
//! the configured [`SourceMode`], and its payload shape is a pure function
//! of the hook inputs and the `include_*` flags; the only advancing state
//! is the id generator.
//!
//! ## Delivery
//!
//! Events are handed to the `on_event` callback synchronously and
//! infallibly; the default callback logs them via `tracing`. Hosts that
//! forward events to a broker or sink supply their own callback and own the
//! buffering/retry policy there; the hook path never blocks on delivery
//! semantics and never surfaces an error into request handling.

pub mod batch;
pub mod builder;
pub mod event;
pub mod hooks;
pub mod ids;
pub mod plugin;
pub mod runtime_config;
pub mod schema;
pub mod serializer;
pub mod transformer;
pub mod validators;

pub use batch::{BatchOptions, JsonBatch};
pub use builder::{
    HeaderVec, PayloadFlags, ReplyInfo, RequestInfo, RouteOptions, SourceMode,
};
pub use event::{CloudEvent, EventOptions, ValidationMode, CONTENT_TYPE_JSON, SPEC_VERSION};
pub use hooks::{EventCallback, HookEmitter, LifecycleHook};
pub use ids::{EventId, IdGenerator, MonotonicIdGenerator, UlidIdGenerator};
pub use plugin::{
    CloudEventsPlugin, PluginOptions, DEFAULT_BASE_NAMESPACE, DEFAULT_SERVER_URL,
};
pub use runtime_config::RuntimeConfig;
pub use schema::{event_schema, strict_event_schema, CompiledSchema, SchemaVersion};
pub use serializer::{FastSerializer, SerializeOptions};
pub use validators::ValidationIssue;
