use std::sync::Arc;

use cloudhooks::{
    CloudEventsPlugin, PluginOptions, RuntimeConfig, SourceMode, UlidIdGenerator,
};
use serde_json::json;

mod common;
use common::{capturing_plugin, drain, sample_request};

#[test]
fn test_option_validation_collects_every_issue() {
    let mut options = PluginOptions {
        server_url: "nope".to_string(),
        base_namespace: "flat".to_string(),
        ..Default::default()
    };
    options.event_options.datacontenttype = Some("not a content type".to_string());
    options.extensions.insert("UPPER".to_string(), json!(1));

    let issues = options.validate();
    let locations: Vec<&str> = issues.iter().map(|i| i.location.as_str()).collect();
    assert!(locations.contains(&"server_url"));
    assert!(locations.contains(&"base_namespace"));
    assert!(locations.contains(&"event_options.datacontenttype"));
    assert!(locations.contains(&"extensions.UPPER"));

    assert!(CloudEventsPlugin::new(options).is_err());
}

#[test]
fn test_new_event_decoration_matches_hook_events() {
    let (plugin, _captured) = capturing_plugin(|_| {});
    let event = plugin.new_event("audit", Some(json!({"actor": "admin"})));
    assert_eq!(event.event_type, "io.github.cloudhooks.audit");
    assert_eq!(event.source, "http://localhost:3000");
    assert_eq!(event.id, "1");
    assert_eq!(event.datacontenttype.as_deref(), Some("application/json"));
}

#[test]
fn test_fast_validate_decoration() {
    let (plugin, captured) = capturing_plugin(|_| {});
    plugin.hooks().on_request(&sample_request());
    let events = drain(&captured);

    assert!(plugin.is_valid_fast(&events[0]));
    assert!(plugin.validate_fast(&events[0]).unwrap().is_empty());

    let mut broken = events[0].clone();
    broken.specversion = "0.3".to_string();
    assert!(!plugin.is_valid_fast(&broken));
    let issues = plugin.validate_fast(&broken).unwrap();
    assert!(issues.iter().any(|i| i.message.contains("0.3")));
}

#[test]
fn test_schema_version_is_logged_and_exposed() {
    let (plugin_a, _) = capturing_plugin(|_| {});
    let (plugin_b, _) = capturing_plugin(|_| {});
    // Same embedded schema, same fingerprint.
    assert_eq!(plugin_a.schema_version(), plugin_b.schema_version());
    assert_eq!(plugin_a.schema_version().hash.len(), 16);
}

#[test]
fn test_ulid_generator_option() {
    let (plugin, captured) = capturing_plugin(|options| {
        options.id_generator = Arc::new(UlidIdGenerator);
    });
    plugin.hooks().on_request(&sample_request());
    let events = drain(&captured);
    assert_eq!(events[0].id.len(), 26);
}

#[test]
fn test_runtime_config_env_round_trip() {
    std::env::set_var("CLOUDHOOKS_SERVER_URL", "http://api.example.com");
    std::env::set_var("CLOUDHOOKS_SOURCE_MODE", "request-path");
    std::env::set_var("CLOUDHOOKS_STRICT", "true");

    let options = RuntimeConfig::from_env().apply(PluginOptions::default());
    assert_eq!(options.server_url, "http://api.example.com");
    assert_eq!(options.server_url_mode, SourceMode::RequestPath);
    assert!(options.event_options.strict);

    std::env::remove_var("CLOUDHOOKS_SERVER_URL");
    std::env::remove_var("CLOUDHOOKS_SOURCE_MODE");
    std::env::remove_var("CLOUDHOOKS_STRICT");
}
