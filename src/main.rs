//! Request logger demo server.
//!
//! Serves a small auth-flavoured API with the request logger installed:
//!
//! - `POST /login` sets context, logs with redaction, warns on bad input and
//!   panics for `fail@example.com` (auto-logged as "Unhandled error")
//! - `GET /health` logs at debug level
//!
//! Request records go to stdout/stderr as NDJSON; the server's own
//! diagnostics go through `tracing`.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_logger::config::load_config;
use request_logger::{AutoLogging, Fields, Level, Logger, LoggerConfig, RequestLoggerLayer};

#[derive(Parser)]
#[command(name = "request-logger-demo")]
#[command(about = "Demo server for the request logger middleware", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in demo settings are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "127.0.0.1:8787")]
    bind: SocketAddr,
}

fn demo_config() -> LoggerConfig {
    LoggerConfig {
        level: Level::Debug,
        auto_logging: AutoLogging::Error,
        trace_header: "x-request-id".to_string(),
        include_cf_properties: vec!["colo".into(), "country".into(), "asn".into()],
        redact_keys: vec!["authorization".into(), "password".into(), "token".into()],
        ..Default::default()
    }
}

fn build_router(config: LoggerConfig) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/health", get(health))
        .layer(RequestLoggerLayer::new(config))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::new())
}

#[derive(Debug, Default, Deserialize)]
struct LoginBody {
    email: Option<String>,
    password: Option<String>,
}

async fn login(log: Logger, headers: HeaderMap, body: Bytes) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let user_id = header("x-user-id").unwrap_or("anonymous");

    log.set_context(json!({"userId": user_id, "feature": "auth-login"}));
    log.info(
        "login request received",
        Fields::new()
            .with("provider", "password")
            .with("authorization", header("authorization")),
    );

    let body: LoginBody = serde_json::from_slice(&body).unwrap_or_default();
    let (Some(email), Some(_password)) = (body.email, body.password) else {
        log.warning("validation failed", json!({"reason": "missing-fields"}));
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid input"}))).into_response();
    };

    if email == "fail@example.com" {
        panic!("Simulated unhandled authentication failure");
    }

    log.info("login successful", json!({"email": email}));
    Json(json!({"ok": true})).into_response()
}

async fn health(log: Logger) -> &'static str {
    log.debug("health check", ());
    "ok"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_logger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => demo_config(),
    };

    tracing::info!(
        level = %config.level,
        auto_logging = ?config.auto_logging,
        redact_keys = config.redact_keys.len(),
        "Request logger configured"
    );

    let listener = TcpListener::bind(cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    axum::serve(listener, build_router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for Ctrl+C");
    }
    tracing::info!("Shutdown signal received");
}
