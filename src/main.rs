use anyhow::Context;
use chat_gateway::config::Args;
use chat_gateway::router;
use chat_gateway::state::AppState;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(args.log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = AppState::from_config(&args);
    let app = router(state.clone());

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(port = args.port, "gateway listening");
    tracing::info!(
        model = state.dispatcher.model(),
        offline = state.dispatcher.offline_mode(),
        "backend"
    );
    tracing::info!(
        require_auth = state.auth.required(),
        max_requests = state.rate_limiter.max_requests(),
        window_secs = state.rate_limiter.window().as_secs(),
        "admission control"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}
