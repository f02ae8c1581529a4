use anyhow::Result;
use std::sync::Arc;

use verifywise_mcp::config::{Config, TransportMode};
use verifywise_mcp::mcp::{default_registry, McpServer};
use verifywise_mcp::registry::ClientRegistry;
use verifywise_mcp::routes;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Logs go to stderr: stdout carries the stdio JSON-RPC stream
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.client.base_url,
        transport = ?config.transport,
        "VerifyWise MCP server starting"
    );

    let clients = Arc::new(ClientRegistry::from_config(config.client.clone()));
    let server = Arc::new(McpServer::new(default_registry(clients.clone())));
    tracing::info!(tools = server.tools().len(), "Tools registered");

    let outcome = match config.transport {
        TransportMode::Stdio => serve_stdio(server).await,
        TransportMode::Http => serve_http(server, &config).await,
    };

    clients.close();
    tracing::info!("Shutdown complete");

    outcome
}

/// Newline-delimited JSON-RPC over stdin/stdout
async fn serve_stdio(server: Arc<McpServer>) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tracing::info!("Serving MCP over stdio");
    tokio::select! {
        result = server.serve(stdin, stdout) => result?,
        _ = shutdown_signal() => {}
    }
    Ok(())
}

/// JSON-RPC over HTTP (`POST /mcp`)
async fn serve_http(server: Arc<McpServer>, config: &Config) -> Result<()> {
    let app = routes::app(routes::AppState { server });

    let addr = format!("{}:{}", config.http_host, config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Serving MCP on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
