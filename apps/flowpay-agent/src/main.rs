use anyhow::{Context, Result};
use flowpay_agent_service::config::Config;
use flowpay_agent_service::{
    ROUTE_AGENT_ACTIONS, ROUTE_AGENT_COMMAND, ROUTE_AGENT_EXECUTE, ROUTE_HEALTH, build_router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    if config.llm.credential().is_none() {
        warn!("no language model API key configured; /api/agent/command will fail until GROQ_API_KEY is set");
    }

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let local_addr = listener.local_addr()?;

    info!(
        addr = %local_addr,
        environment = %config.environment,
        model = %config.llm.model,
        "flowpay agent listening"
    );
    info!(
        health = %format!("http://{local_addr}{ROUTE_HEALTH}"),
        command = %format!("http://{local_addr}{ROUTE_AGENT_COMMAND}"),
        execute = %format!("http://{local_addr}{ROUTE_AGENT_EXECUTE}"),
        actions = %format!("http://{local_addr}{ROUTE_AGENT_ACTIONS}"),
        "endpoints"
    );

    axum::serve(listener, build_router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with an error")?;

    info!("flowpay agent stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
