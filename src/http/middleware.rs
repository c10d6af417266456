//! Tower layer that gives every request its own logger.
//!
//! # Responsibilities
//! - Start an `InFlight` lifecycle per request
//! - Publish the request's `Logger` in the request extensions
//! - Emit the automatic record once the inner service finishes
//! - Hand failures back unchanged: errors are returned, panics resumed
//!
//! # Design Decisions
//! - Panics are caught only to log them; the original payload is re-raised
//! - Works on any `Service<Request<B>>`, not only axum routers

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures_util::FutureExt;
use tower::{Layer, Service};

use crate::config::LoggerConfig;
use crate::http::lifecycle::{InFlight, Outcome};
use crate::logging::{ErrorInfo, Output, Sink};

/// Layer installing `RequestLoggerService`.
#[derive(Debug, Clone)]
pub struct RequestLoggerLayer {
    config: Arc<LoggerConfig>,
    sink: Sink,
}

impl RequestLoggerLayer {
    /// Logs to the process stdout/stderr.
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_sink(config, Sink::stdio())
    }

    pub fn with_sink(config: LoggerConfig, sink: Sink) -> Self {
        Self {
            config: Arc::new(config),
            sink,
        }
    }

    pub fn with_output(config: LoggerConfig, output: impl Output) -> Self {
        Self::with_sink(config, Sink::new(output))
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }
}

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggerService {
            inner,
            config: self.config.clone(),
            sink: self.sink.clone(),
        }
    }
}

/// Service wrapper that logs around the inner service.
#[derive(Debug, Clone)]
pub struct RequestLoggerService<S> {
    inner: S,
    config: Arc<LoggerConfig>,
    sink: Sink,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLoggerService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Display + 'static,
    ReqBody: 'static,
    ResBody: 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let flight = InFlight::begin(&req, &self.config, &self.sink);
        req.extensions_mut().insert(flight.logger().clone());

        let future = match panic::catch_unwind(AssertUnwindSafe(|| self.inner.call(req))) {
            Ok(future) => future,
            Err(payload) => {
                flight.finish(&Outcome::Failed {
                    error: ErrorInfo::from_panic(&*payload),
                });
                panic::resume_unwind(payload);
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(response)) => {
                    flight.finish(&Outcome::Completed {
                        status: response.status(),
                    });
                    Ok(response)
                }
                Ok(Err(error)) => {
                    flight.finish(&Outcome::Failed {
                        error: ErrorInfo::new(error.to_string()),
                    });
                    Err(error)
                }
                Err(payload) => {
                    flight.finish(&Outcome::Failed {
                        error: ErrorInfo::from_panic(&*payload),
                    });
                    panic::resume_unwind(payload)
                }
            }
        })
    }
}
