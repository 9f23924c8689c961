use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use axum::{Router, http::StatusCode};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    api::{self, AppState},
    config::ServerConfig,
};

pub fn app(config: &ServerConfig, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(state))
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_seconds.into()),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the flow until ctrl-c
pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let app = app(config, state);

    if let (Some(cert), Some(key)) = (&config.tls_cert_path, &config.tls_key_path) {
        return serve_tls(addr, app, cert, key).await;
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Flow server running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Flow server failed")
}

#[cfg(feature = "tls")]
async fn serve_tls(
    addr: SocketAddr,
    app: Router,
    cert: &std::path::Path,
    key: &std::path::Path,
) -> Result<()> {
    use axum_server::{Handle, tls_rustls::RustlsConfig};

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {}", cert.display()))?;

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!("Flow server running at https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("Flow server failed")
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(
    _addr: SocketAddr,
    _app: Router,
    _cert: &std::path::Path,
    _key: &std::path::Path,
) -> Result<()> {
    Err(crate::CompassError::config("TLS paths are set but compass was built without the tls feature").into())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down flow server");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::TokenSource, client::CompassClient, config::CompassConfig, flow::ItineraryFlow,
    };
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let mut config = CompassConfig::default();
        config.firebase.project_id = "compass-test".to_string();
        let client = Arc::new(
            CompassClient::with_token_source(config, TokenSource::Static("t".to_string()))
                .unwrap(),
        );
        AppState {
            flow: Arc::new(ItineraryFlow::from_client(client.clone())),
            project_id: client.project_id().to_string(),
            plugins: client.plugins().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_layered_app_serves_health() {
        let response = app(&ServerConfig::default(), state())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["projectId"], "compass-test");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let config = ServerConfig {
            body_limit_bytes: 16,
            ..ServerConfig::default()
        };
        let body = serde_json::json!({ "data": { "request": "a long beach vacation in Europe" } });
        let response = app(&config, state())
            .oneshot(
                Request::post("/api/itineraryFlow")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::OK);
    }
}
