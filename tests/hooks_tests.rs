use chrono::{TimeZone, Utc};
use cloudhooks::{LifecycleHook, RouteOptions, ValidationMode};
use serde_json::json;

mod common;
use common::{capturing_plugin, drain, sample_reply, sample_request};

#[test]
fn test_every_hook_emits_one_event_with_namespaced_type() {
    let (plugin, captured) = capturing_plugin(|_| {});
    let req = sample_request();
    let reply = sample_reply();
    let body = json!({"name": "Fluffy"});
    let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    let route = RouteOptions {
        method: "GET".to_string(),
        path: "/pets/{id}".to_string(),
        handler_name: Some("get_pet".to_string()),
        config: serde_json::Value::Null,
    };

    let hooks = plugin.hooks();
    hooks.on_request(&req);
    hooks.pre_parsing(&req, &reply);
    hooks.pre_validation(&req, &reply);
    hooks.pre_handler(&req, &reply);
    hooks.pre_serialization(&req, &reply, &body);
    hooks.on_error(&req, &reply, &err);
    hooks.on_send(&req, &reply, &body);
    hooks.on_response(&req, &reply);
    hooks.on_timeout(&req, &reply);
    hooks.on_request_abort(&req);
    hooks.on_ready();
    hooks.on_listen();
    hooks.on_close();
    hooks.on_register();
    hooks.on_route(&route);

    let events = drain(&captured);
    assert_eq!(events.len(), LifecycleHook::ALL.len());
    for (event, hook) in events.iter().zip(LifecycleHook::ALL) {
        assert_eq!(
            event.event_type,
            format!("io.github.cloudhooks.{}", hook.name())
        );
        assert!(event.is_valid(ValidationMode::Strict));
    }
}

#[test]
fn test_ids_advance_monotonically() {
    let (plugin, captured) = capturing_plugin(|_| {});
    let req = sample_request();
    plugin.hooks().on_request(&req);
    plugin.hooks().on_request(&req);
    plugin.hooks().on_request(&req);
    let ids: Vec<String> = drain(&captured).into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn test_request_payload_shape() {
    let (plugin, captured) = capturing_plugin(|_| {});
    plugin.hooks().on_request(&sample_request());
    let events = drain(&captured);
    let data = events[0].data.as_ref().unwrap();

    let request = &data["request"];
    assert_eq!(request["id"], "req-1");
    assert_eq!(request["method"], "GET");
    assert_eq!(request["url"], "/pets/12345?verbose=1");
    assert_eq!(request["route"], "/pets/{id}");
    assert_eq!(request["query"]["verbose"], "1");
    // Off by default: headers, HTTP attributes, redundant attributes.
    assert!(request.get("headers").is_none());
    assert!(request.get("http_version").is_none());
    assert!(data.get("id").is_none());
    assert!(data.get("timestamp").is_none());
}

#[test]
fn test_include_flags_extend_payload() {
    let (plugin, captured) = capturing_plugin(|options| {
        options.include_headers = true;
        options.include_http_attributes = true;
        options.include_redundant_attributes = true;
    });
    plugin.hooks().on_request(&sample_request());
    let events = drain(&captured);
    let event = &events[0];
    let data = event.data.as_ref().unwrap();

    let request = &data["request"];
    assert_eq!(request["headers"]["x-api-key"], "test123");
    assert_eq!(request["http_version"], "1.1");
    assert_eq!(request["original_url"], "/pets/12345?verbose=1");
    // Redundant attributes mirror the envelope.
    assert_eq!(data["id"], json!(event.id));
    assert!(data["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_request_reply_and_body_payloads() {
    let (plugin, captured) = capturing_plugin(|_| {});
    let req = sample_request();
    let reply = sample_reply();
    let body = json!({"name": "Fluffy", "species": "Cat"});

    plugin.hooks().pre_handler(&req, &reply);
    plugin.hooks().on_send(&req, &reply, &body);

    let events = drain(&captured);
    let pre_handler = events[0].data.as_ref().unwrap();
    assert_eq!(pre_handler["reply"]["status_code"], 200);
    assert_eq!(pre_handler["reply"]["sent"], true);
    assert_eq!(pre_handler["reply"]["elapsed_ms"], 12);
    assert!(pre_handler.get("payload").is_none());

    let on_send = events[1].data.as_ref().unwrap();
    assert_eq!(on_send["payload"], body);
}

#[test]
fn test_error_payload_carries_error_and_process_info() {
    let (plugin, captured) = capturing_plugin(|_| {});
    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    plugin
        .hooks()
        .on_error(&sample_request(), &sample_reply(), &err);

    let events = drain(&captured);
    let data = events[0].data.as_ref().unwrap();
    assert_eq!(data["error"]["message"], "upstream timed out");
    assert_eq!(data["error"]["status"], 200);
    assert!(data["process"]["pid"].as_u64().is_some());
    assert!(data["process"]["uptime_ms"].as_u64().is_some());
}

#[test]
fn test_server_hooks_carry_plugin_metadata() {
    let (plugin, captured) = capturing_plugin(|_| {});
    plugin.hooks().on_ready();
    let events = drain(&captured);
    let data = events[0].data.as_ref().unwrap();
    assert_eq!(data["name"], "cloudhooks");
    assert!(data["version"].as_str().unwrap().starts_with("0.1"));
    assert!(data.get("timestamp").is_some());
    // Server-level events are sourced from the base URL.
    assert_eq!(events[0].source, "http://localhost:3000");
}

#[test]
fn test_on_route_forwards_raw_options() {
    let (plugin, captured) = capturing_plugin(|_| {});
    let route = RouteOptions {
        method: "POST".to_string(),
        path: "/pets".to_string(),
        handler_name: Some("add_pet".to_string()),
        config: json!({"request_body_required": true}),
    };
    plugin.hooks().on_route(&route);

    let events = drain(&captured);
    let data = events[0].data.as_ref().unwrap();
    assert_eq!(data["method"], "POST");
    assert_eq!(data["path"], "/pets");
    assert_eq!(data["handler_name"], "add_pet");
    assert_eq!(data["config"]["request_body_required"], true);
}

#[test]
fn test_configured_extensions_stamped_on_every_event() {
    let (plugin, captured) = capturing_plugin(|options| {
        options
            .extensions
            .insert("tenant".to_string(), json!("acme"));
    });
    plugin.hooks().on_ready();
    plugin.hooks().on_request(&sample_request());

    for event in drain(&captured) {
        assert_eq!(event.extensions["tenant"], json!("acme"));
    }
}

#[test]
fn test_emission_is_deterministic_for_fixed_inputs() {
    let pinned = Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap();
    let build = || {
        capturing_plugin(|options| {
            options.event_options.time = Some(pinned);
        })
    };

    let (plugin_a, captured_a) = build();
    let (plugin_b, captured_b) = build();
    let req = sample_request();
    let reply = sample_reply();
    plugin_a.hooks().on_request(&req);
    plugin_a.hooks().on_response(&req, &reply);
    plugin_b.hooks().on_request(&req);
    plugin_b.hooks().on_response(&req, &reply);

    assert_eq!(drain(&captured_a), drain(&captured_b));
}
