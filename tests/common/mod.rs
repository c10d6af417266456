//! Shared utilities for middleware integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Map, Value};

use request_logger::logging::MemoryOutput;
use request_logger::{CfProperties, Logger, LoggerConfig, RequestLoggerLayer};

/// Builds the test application with every line captured in memory.
pub fn app(config: LoggerConfig) -> (Router, MemoryOutput) {
    let output = MemoryOutput::new();
    let router = Router::new()
        .route("/test", post(echo))
        .route("/created", post(created))
        .route("/panic", get(panics))
        .route("/unavailable", get(unavailable))
        .layer(RequestLoggerLayer::with_output(config, output.clone()));
    (router, output)
}

async fn echo(log: Logger) -> &'static str {
    log.set_context(json!({"feature": "integration"}));
    log.info("handled", json!({"authorization": "inner-secret", "step": 1}));
    "ok"
}

async fn created() -> StatusCode {
    StatusCode::CREATED
}

async fn panics() -> &'static str {
    panic!("handler exploded")
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

/// A request carrying the given headers.
pub fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

/// Attaches platform properties the way an edge integration would.
#[allow(dead_code)]
pub fn with_cf(mut req: Request<Body>, cf: Value) -> Request<Body> {
    let map: Map<String, Value> = match cf {
        Value::Object(map) => map,
        other => panic!("cf properties must be an object, got {other}"),
    };
    req.extensions_mut().insert(CfProperties::from(map));
    req
}
