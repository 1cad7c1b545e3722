//! # Plugin Module
//!
//! The entry point: validate options once, compile the event schema once,
//! then hand out the pieces a host decorates itself with: the hook
//! emitter, the fast serializer/validator and the event constructor.
//!
//! ## Setup flow
//!
//! 1. [`PluginOptions`] are validated field by field; every problem is
//!    collected and reported in one error.
//! 2. The strict event schema (envelope only, no `data`) is compiled into a
//!    [`CompiledSchema`] and fingerprinted.
//! 3. The [`FastSerializer`] and [`HookEmitter`] are wired against the
//!    shared compiled schema and the configured callback.
//!
//! Setup is the only fallible phase. After `new` returns, every hook and
//! decoration call is infallible or returns its own `Result`; none of them
//! can panic the host.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::bail;
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::builder::{PayloadFlags, SourceMode};
use crate::event::{CloudEvent, EventOptions};
use crate::hooks::{EventCallback, HookEmitter};
use crate::ids::{IdGenerator, MonotonicIdGenerator};
use crate::schema::{self, CompiledSchema, SchemaVersion};
use crate::serializer::{FastSerializer, SerializeOptions};
use crate::validators::{self, format_issues, ValidationIssue};

/// Default base URL events are sourced from when the host does not say.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default reverse-DNS prefix for event types.
pub const DEFAULT_BASE_NAMESPACE: &str = "io.github.cloudhooks";

/// Everything configurable about the plugin.
///
/// Plain fields on purpose: build one with `..Default::default()` and
/// override what you need.
#[derive(Clone)]
pub struct PluginOptions {
    /// Base URL of the host service; must parse as an absolute URL.
    pub server_url: String,
    /// How request-scoped event sources are computed.
    pub server_url_mode: SourceMode,
    /// Reverse-DNS prefix for event types, e.g. `com.example.api`.
    pub base_namespace: String,
    /// Source of event ids; monotonic counter by default.
    pub id_generator: Arc<dyn IdGenerator>,
    /// Attach request headers to request summaries.
    pub include_headers: bool,
    /// Attach `http_version`, `original_url` and `upgrade` to request summaries.
    pub include_http_attributes: bool,
    /// Merge `id` and `timestamp` (already on the envelope) into payloads.
    pub include_redundant_attributes: bool,
    /// Optional attributes applied to every built event.
    pub event_options: EventOptions,
    /// Extension context attributes stamped on every event.
    pub extensions: BTreeMap<String, Value>,
    /// Receiver for every emitted event. Defaults to a `tracing` logger.
    pub on_event: EventCallback,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            server_url_mode: SourceMode::default(),
            base_namespace: DEFAULT_BASE_NAMESPACE.to_string(),
            id_generator: Arc::new(MonotonicIdGenerator::new()),
            include_headers: false,
            include_http_attributes: false,
            include_redundant_attributes: false,
            event_options: EventOptions::default(),
            extensions: BTreeMap::new(),
            on_event: default_callback(),
        }
    }
}

impl std::fmt::Debug for PluginOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginOptions")
            .field("server_url", &self.server_url)
            .field("server_url_mode", &self.server_url_mode)
            .field("base_namespace", &self.base_namespace)
            .field("include_headers", &self.include_headers)
            .field("include_http_attributes", &self.include_http_attributes)
            .field(
                "include_redundant_attributes",
                &self.include_redundant_attributes,
            )
            .field("extensions", &self.extensions)
            .finish()
    }
}

fn default_callback() -> EventCallback {
    Arc::new(|event: CloudEvent| {
        info!(
            target: "cloudhooks",
            event_id = %event.id,
            event_type = %event.event_type,
            source = %event.source,
            "cloud event"
        );
    })
}

impl PluginOptions {
    /// Check every option, collecting all issues.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if let Err(issue) = validators::ensure_url("server_url", &self.server_url) {
            issues.push(issue);
        }
        if let Err(issue) = validators::ensure_namespace("base_namespace", &self.base_namespace) {
            issues.push(issue);
        }
        if let Some(ct) = &self.event_options.datacontenttype {
            if let Err(mut issue) = validators::ensure_content_type("datacontenttype", ct) {
                issue.location = "event_options.datacontenttype".to_string();
                issues.push(issue);
            }
        }
        if let Some(ds) = &self.event_options.dataschema {
            if let Err(mut issue) = validators::ensure_uri_reference("dataschema", ds) {
                issue.location = "event_options.dataschema".to_string();
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
}

/// The configured plugin: compiled schema, fast serializer and hook emitter.
///
/// One instance per host service, built at startup and shared from there.
pub struct CloudEventsPlugin {
    base_namespace: String,
    server_url: Url,
    event_options: EventOptions,
    id_generator: Arc<dyn IdGenerator>,
    schema: Arc<CompiledSchema>,
    serializer: FastSerializer,
    emitter: HookEmitter,
}

impl std::fmt::Debug for CloudEventsPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudEventsPlugin")
            .field("base_namespace", &self.base_namespace)
            .field("server_url", &self.server_url.as_str())
            .field("schema", &self.schema)
            .finish()
    }
}

impl CloudEventsPlugin {
    /// Validate options, compile the event schema and wire the emitter.
    pub fn new(options: PluginOptions) -> anyhow::Result<Self> {
        let issues = options.validate();
        if !issues.is_empty() {
            bail!("invalid plugin options: {}", format_issues(&issues));
        }
        // Validated above; parse cannot fail here.
        let server_url = Url::parse(&options.server_url)?;

        let schema = Arc::new(CompiledSchema::compile(&schema::strict_event_schema())?);
        info!(
            schema_version = schema.version().version,
            schema_hash = %schema.version().hash,
            base_namespace = %options.base_namespace,
            source_mode = ?options.server_url_mode,
            "cloud events plugin ready"
        );

        let serializer = FastSerializer::new(Arc::clone(&schema));
        let flags = PayloadFlags {
            include_headers: options.include_headers,
            include_http_attributes: options.include_http_attributes,
            include_redundant_attributes: options.include_redundant_attributes,
        };
        let emitter = HookEmitter::new(
            options.base_namespace.clone(),
            server_url.clone(),
            options.server_url_mode,
            flags,
            options.event_options.clone(),
            options.extensions.clone(),
            Arc::clone(&options.id_generator),
            Arc::clone(&options.on_event),
        );

        Ok(Self {
            base_namespace: options.base_namespace,
            server_url,
            event_options: options.event_options,
            id_generator: options.id_generator,
            schema,
            serializer,
            emitter,
        })
    }

    /// Build with default options.
    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::new(PluginOptions::default())
    }

    /// The per-hook event emitters.
    pub fn hooks(&self) -> &HookEmitter {
        &self.emitter
    }

    /// Construct an event the way the hook emitters do: namespaced type,
    /// base-URL source, generated id, configured options.
    pub fn new_event(&self, type_suffix: &str, data: Option<Value>) -> CloudEvent {
        CloudEvent::new(
            self.id_generator.next_id(),
            format!("{}.{type_suffix}", self.base_namespace),
            crate::builder::source_url(SourceMode::ServerUrl, &self.server_url, None),
            data,
            &self.event_options,
        )
    }

    /// Schema-compiled serialization; see [`FastSerializer::serialize`].
    pub fn serialize_fast(&self, event: &CloudEvent) -> anyhow::Result<String> {
        self.serializer.serialize(event)
    }

    /// Checked serialization with [`SerializeOptions`].
    pub fn serialize_fast_checked(
        &self,
        event: &CloudEvent,
        opts: &SerializeOptions,
    ) -> anyhow::Result<String> {
        self.serializer.serialize_checked(event, opts)
    }

    /// Schema-compiled envelope validation.
    pub fn validate_fast(&self, event: &CloudEvent) -> anyhow::Result<Vec<ValidationIssue>> {
        self.serializer.validate_event(event)
    }

    /// Boolean shorthand for [`CloudEventsPlugin::validate_fast`].
    pub fn is_valid_fast(&self, event: &CloudEvent) -> bool {
        self.serializer.is_valid_event(event)
    }

    /// The serializer itself, for hosts that want to share it.
    pub fn serializer(&self) -> &FastSerializer {
        &self.serializer
    }

    /// Fingerprint of the compiled schema.
    pub fn schema_version(&self) -> &SchemaVersion {
        self.schema.version()
    }
}
