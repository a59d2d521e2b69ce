//! Document explorer server binary
//!
//! Run with: cargo run -p doc-explorer --bin doc-explorer-server

use clap::Parser;
use doc_explorer::{agent::InterpreterLocator, config::ExplorerConfig, server::ExplorerServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "doc-explorer-server", version, about = "RLM document explorer API")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DOC_EXPLORER_CONFIG")]
    config: Option<PathBuf>,

    /// Host address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env in the working directory or its parent
    if dotenv::dotenv().is_err() {
        let _ = dotenv::from_path("../.env");
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_explorer=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = ExplorerConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Multi-provider: {}", config.agent.multi_provider);
    if !config.agent.multi_provider {
        tracing::info!("  - Model: {}", config.agent.default_model);
        if config.agent.api_key.is_none() {
            tracing::warn!("GOOGLE_API_KEY is not set; queries will fail until it is");
        }
    }
    tracing::info!("  - CORS origins: {}", config.cors.allowed_origins.join(", "));
    tracing::info!(
        "  - Limits: {} iterations, {} sub-queries",
        config.agent.max_iterations,
        config.agent.max_llm_calls
    );

    match InterpreterLocator::from_env(config.interpreter.path.clone()).locate() {
        Ok(path) => tracing::info!("Deno found at {}", path.display()),
        Err(e) => tracing::warn!("{}", e),
    }

    let server = ExplorerServer::new(config);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/upload          - Upload a document");
    println!("  GET    /api/documents       - List documents");
    println!("  DELETE /api/documents/:id   - Delete a document");
    println!("  POST   /api/query           - Ask a question");
    println!("  WS     /ws/query            - Ask with streamed steps");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
