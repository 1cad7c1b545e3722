#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cloudhooks::{
    CloudEvent, CloudEventsPlugin, PluginOptions, ReplyInfo, RequestInfo,
};
use http::{Method, StatusCode};
use smallvec::smallvec;

/// Events captured from the plugin callback, in emission order.
pub type Captured = Arc<Mutex<Vec<CloudEvent>>>;

/// Plugin options whose callback records every event into the returned sink.
pub fn capturing_options() -> (PluginOptions, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    let options = PluginOptions {
        on_event: Arc::new(move |event| sink.lock().unwrap().push(event)),
        ..Default::default()
    };
    (options, captured)
}

/// A ready plugin wired to a capturing callback.
pub fn capturing_plugin(mutate: impl FnOnce(&mut PluginOptions)) -> (CloudEventsPlugin, Captured) {
    let (mut options, captured) = capturing_options();
    mutate(&mut options);
    let plugin = CloudEventsPlugin::new(options).expect("plugin options are valid");
    (plugin, captured)
}

/// Take the captured events out of the sink.
pub fn drain(captured: &Captured) -> Vec<CloudEvent> {
    captured.lock().unwrap().drain(..).collect()
}

/// A representative GET request with headers, query and routing info.
pub fn sample_request() -> RequestInfo {
    RequestInfo {
        request_id: Some("req-1".to_string()),
        method: Method::GET,
        url: "/pets/12345?verbose=1".to_string(),
        route: Some("/pets/{id}".to_string()),
        headers: smallvec![
            ("Host".to_string(), "localhost:3000".to_string()),
            ("X-API-Key".to_string(), "test123".to_string()),
        ],
        query_params: vec![("verbose".to_string(), "1".to_string())],
        hostname: Some("localhost".to_string()),
        remote_addr: Some("127.0.0.1".to_string()),
        http_version: Some("1.1".to_string()),
        original_url: Some("/pets/12345?verbose=1".to_string()),
        upgrade: None,
    }
}

pub fn sample_reply() -> ReplyInfo {
    ReplyInfo {
        status: StatusCode::OK,
        sent: true,
        elapsed: Some(Duration::from_millis(12)),
    }
}
