//! HTTP server with graceful shutdown

use std::any::Any;
use std::net::SocketAddr;

use axum::{
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    error::Result,
    handlers::ApiError,
    middleware::{request_id_layer, request_id_propagation_layer, sensitive_headers_layer},
};

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Serve `app` with the configured middleware until a shutdown signal arrives
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!("Starting {} on {}", self.config.service.name, addr);
        self.log_middleware_config();

        let app = apply_middleware(app, &self.config);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    fn log_middleware_config(&self) {
        let middleware = &self.config.middleware;
        tracing::info!(
            catch_panic = middleware.catch_panic,
            request_id = middleware.request_id,
            compression = middleware.compression,
            cors_mode = %middleware.cors_mode,
            body_limit_mb = middleware.body_limit_mb,
            timeout_secs = self.config.service.timeout_secs,
            "middleware configured"
        );
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Wrap `app` in the server middleware stack.
///
/// Layers added last run first: request ids are assigned before tracing, and
/// panics are caught closest to the handlers.
pub fn apply_middleware(app: Router, config: &Config) -> Router {
    let middleware = &config.middleware;

    let app = if middleware.catch_panic {
        app.layer(CatchPanicLayer::custom(panic_response))
    } else {
        app
    };

    let app = app
        .layer(sensitive_headers_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        );

    let app = if middleware.request_id {
        app.layer(request_id_propagation_layer())
            .layer(request_id_layer())
    } else {
        app
    };

    let app = app
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes()))
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            config.timeout(),
        ));

    let app = if middleware.compression {
        app.layer(CompressionLayer::new())
    } else {
        app
    };

    match build_cors_layer(&middleware.cors_mode) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    ApiError::internal("An internal error occurred").into_response()
}

fn build_cors_layer(mode: &str) -> Option<CorsLayer> {
    match mode {
        "permissive" => {
            tracing::debug!("Enabling permissive CORS");
            Some(CorsLayer::permissive())
        }
        "restrictive" => {
            tracing::debug!("Enabling restrictive CORS (default deny)");
            Some(CorsLayer::new())
        }
        "disabled" => None,
        other => {
            tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", other);
            Some(CorsLayer::permissive())
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    async fn panics() -> &'static str {
        panic!("boom")
    }

    fn test_router() -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/panic", get(panics))
    }

    #[test]
    fn test_server_creation() {
        let config = Config::default();
        let server = Server::new(config.clone());
        assert_eq!(server.config().service.port, config.service.port);
    }

    #[test]
    fn test_cors_modes() {
        assert!(build_cors_layer("permissive").is_some());
        assert!(build_cors_layer("restrictive").is_some());
        assert!(build_cors_layer("disabled").is_none());
    }

    #[tokio::test]
    async fn test_request_id_is_returned() {
        let app = apply_middleware(test_router(), &Config::default());
        let response = app
            .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(id.starts_with("req_"));
    }

    #[tokio::test]
    async fn test_client_request_id_is_kept() {
        let app = apply_middleware(test_router(), &Config::default());
        let response = app
            .oneshot(
                Request::get("/ok")
                    .header("x-request-id", "client-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "client-42");
    }

    #[tokio::test]
    async fn test_panic_becomes_json_500() {
        let app = apply_middleware(test_router(), &Config::default());
        let response = app
            .oneshot(Request::get("/panic").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }
}
