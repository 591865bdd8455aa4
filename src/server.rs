//! HTTP proxy in front of the generation providers.
//!
//! Keeps provider credentials server side; the game only ever talks to
//! [`GENERATE_QUEST_PATH`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{extract::State, Json, Router};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::ProviderConfig;
use crate::quest::{ProviderSettings, QuestGenerator};

pub const GENERATE_QUEST_PATH: &str = "/api/generate-quest";

const ALLOW_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
const ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

#[derive(Clone)]
pub struct AppState {
    generator: Option<Arc<QuestGenerator>>,
    unavailable: Arc<str>,
}

impl AppState {
    pub fn new(generator: QuestGenerator) -> Self {
        Self { generator: Some(Arc::new(generator)), unavailable: Arc::from("") }
    }

    /// A proxy with no usable provider; every generation fails with `reason`.
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self { generator: None, unavailable: Arc::from(reason.into()) }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        match ProviderSettings::from_config(config) {
            Ok(settings) => {
                info!("Quest provider: {} ({})", settings.kind.label(), settings.model);
                Self::new(QuestGenerator::new(settings))
            }
            Err(e) => {
                warn!("No quest provider available: {e}");
                Self::unconfigured(e.to_string())
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            GENERATE_QUEST_PATH,
            post(generate_quest).options(preflight).fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(cors_header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"))
        .layer(cors_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .layer(cors_header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS))
        .layer(cors_header(header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS))
}

fn cors_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

async fn health() -> &'static str {
    "ok"
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "error": "Method not allowed" }))).into_response()
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    prompt: Option<String>,
}

// The body is read raw so a malformed payload maps to the same 400 as a
// missing prompt rather than axum's extractor rejection.
async fn generate_quest(State(state): State<AppState>, body: Bytes) -> Response {
    let prompt = serde_json::from_slice::<GenerateRequest>(&body)
        .ok()
        .and_then(|r| r.prompt)
        .filter(|p| !p.trim().is_empty());
    let Some(prompt) = prompt else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Prompt is required" }))).into_response();
    };

    let result = match &state.generator {
        Some(generator) => generator.generate(&prompt).await.map_err(|e| e.to_string()),
        None => Err(state.unavailable.to_string()),
    };

    match result {
        Ok(quest) => (StatusCode::OK, Json(quest)).into_response(),
        Err(details) => {
            error!("Quest generation error: {details}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate quest", "details": details })),
            )
                .into_response()
        }
    }
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_listener(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down quest server");
    })
    .await?;
    Ok(())
}

pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);
    let addr = listener.local_addr()?;
    info!("Quest server listening on http://{addr}{GENERATE_QUEST_PATH}");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(addr)
}
