mod catalog;
mod config;
mod logging;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use clap::{Parser, Subcommand};
use modkit_hal::{
    DocumentationRenderer, HtmlRenderer, RelationRegistry, discovery_router, docs_router,
};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

/// HAL Server - hypermedia demo catalog with discovery and relation docs
#[derive(Parser)]
#[command(name = "hal-server")]
#[command(about = "HAL Server - hypermedia demo catalog with discovery and relation docs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port, cli.verbose);

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    logging::init_logging(&config.logging);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(&config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    config.bind_addr()?;
    drop(build_app(config));
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

/// Install every service into one registry and mount its routes next to the
/// discovery document and the generated documentation.
fn build_app(config: &AppConfig) -> Router {
    let mut registry = RelationRegistry::new();
    let catalog = registry.install(catalog::declare());
    let registry = Arc::new(registry);
    tracing::debug!(
        services = registry.list_services().len(),
        "Relation registry ready"
    );

    let mut app = Router::new()
        .nest(
            catalog::BASE_PATH,
            catalog::router(catalog::CatalogState::new(Arc::clone(&registry), catalog)),
        )
        .merge(discovery_router(
            Arc::clone(&registry),
            &config.hal.discovery_path,
        ));
    if config.hal.serve_docs {
        let renderer: Arc<dyn DocumentationRenderer> = Arc::new(HtmlRenderer);
        app = app.merge(docs_router(&registry, &renderer));
    }
    app
}

async fn run_server(config: &AppConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let app = build_app(config);

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(shutdown::shutdown_on_signal(cancel.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, discovery = %config.hal.discovery_path, "HAL server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    // the server can also stop on its own; release the signal listener
    cancel.cancel();
    let reason = signals.await?;
    tracing::info!(%reason, "HTTP server stopped gracefully");
    Ok(())
}
