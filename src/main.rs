use notegpt_proxy::app::{build_app, load_state};
use notegpt_proxy::error::AppError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,notegpt_proxy=debug")),
        )
        .json()
        .init();

    if let Err(err) = serve().await {
        tracing::error!(code = %err.code, "startup failed: {}", err.message);
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn serve() -> Result<(), AppError> {
    let state = load_state().await?;
    let addr = state.runtime.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::internal("listen_failed", err.to_string()))?;
    tracing::info!(
        %addr,
        upstream = %state.runtime.upstream.url,
        timeout_ms = state.runtime.upstream.timeout_ms,
        "notegpt proxy listening"
    );
    axum::serve(listener, build_app(state))
        .await
        .map_err(|err| AppError::internal("serve_failed", err.to_string()))
}
