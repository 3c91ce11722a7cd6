use crate::config::{
    DEFAULT_ANONYMOUS_USER_ID, DEFAULT_TIMEOUT_MS, DEFAULT_UPSTREAM_URL, ModelCatalog,
    UpstreamConfig,
};
use crate::error::{AppError, AppResult};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeConfig>,
    pub catalog: Arc<ModelCatalog>,
    pub http: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen: String,
    pub upstream: UpstreamConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values and timeouts that
    /// are not a positive integer fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let listen =
            non_blank("NOTEGPT_PROXY_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let url = non_blank("NOTEGPT_PROXY_UPSTREAM_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let timeout_ms = non_blank("NOTEGPT_PROXY_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let anonymous_user_id = non_blank("NOTEGPT_PROXY_ANONYMOUS_USER_ID")
            .unwrap_or_else(|| DEFAULT_ANONYMOUS_USER_ID.to_string());
        Self {
            listen,
            upstream: UpstreamConfig {
                url,
                timeout_ms,
                anonymous_user_id,
                ..UpstreamConfig::default()
            },
        }
    }

    pub fn listen_addr(&self) -> AppResult<SocketAddr> {
        self.listen.trim().parse::<SocketAddr>().map_err(|err: std::net::AddrParseError| {
            AppError::internal("listen_invalid", format!("{}: {err}", self.listen))
        })
    }
}

pub async fn load_state() -> AppResult<AppState> {
    load_state_with_runtime(RuntimeConfig::from_env()).await
}

pub async fn load_state_with_runtime(runtime: RuntimeConfig) -> AppResult<AppState> {
    let http = reqwest::Client::builder()
        .user_agent(runtime.upstream.user_agent.as_str())
        .build()
        .map_err(|err| AppError::internal("http_client_init_failed", err.to_string()))?;

    tracing::debug!(
        upstream = %runtime.upstream.url,
        timeout_ms = runtime.upstream.timeout_ms,
        "runtime configured"
    );

    Ok(AppState {
        runtime: Arc::new(runtime),
        catalog: Arc::new(ModelCatalog::default()),
        http,
    })
}

pub fn build_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/", get(crate::handlers::service_info))
        .route("/api", get(crate::handlers::service_info))
        .route("/api/chat", get(crate::handlers::chat))
        .route("/api/modelos", get(crate::handlers::list_models))
        .fallback(crate::handlers::not_found)
        .method_not_allowed_fallback(crate::handlers::method_not_allowed)
        .with_state(state)
        .layer(cors_preflight_layer())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET"),
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Answers `OPTIONS` preflights; plain responses get their CORS headers from
/// the `SetResponseHeaderLayer`s so even error pages carry them.
fn cors_preflight_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE])
}
