mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use condition_monitor::web_server::AppState;
use condition_monitor::{Config, MonitoringService, WebServer};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments first to get debug flag
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::load_or_default(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        None => run_service(config).await?,
        Some(Commands::Show) => handle_show_command(config).await?,
    }

    Ok(())
}

/// Run the monitor, the resource watcher and the HTTP server until Ctrl+C
async fn run_service(config: Config) -> Result<()> {
    let server_config = config.server.clone();
    let service = MonitoringService::initialize(config).await?;
    service.start().await?;

    println!("🎯 Condition monitor started");
    println!(
        "📂 Resource directory: {}",
        service.resources.resource_dir().display()
    );

    let shutdown = CancellationToken::new();
    let server_handle = if server_config.enabled {
        let web_server = WebServer::new(
            server_config.port,
            server_config.host.clone(),
            AppState::from(&service),
        );
        let token = shutdown.clone();
        println!("🌐 API available at: http://{}", server_config.bind_address());
        Some(tokio::spawn(async move {
            if let Err(e) = web_server.start(token).await {
                tracing::error!("❌ Web server failed: {}", e);
            }
        }))
    } else {
        println!("💡 HTTP API disabled in configuration");
        None
    };

    println!("🛑 Press Ctrl+C to stop");

    signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c")?;
    println!("\n🛑 Received Ctrl+C, shutting down...");

    shutdown.cancel();
    if let Some(handle) = server_handle {
        if let Err(e) = handle.await {
            tracing::error!("❌ Web server task failed: {}", e);
        }
    }
    service.shutdown().await;

    Ok(())
}

/// Handle show command
async fn handle_show_command(config: Config) -> Result<()> {
    let service = MonitoringService::initialize(config).await?;

    println!("Server config:");
    println!("  enabled: {}", service.config.server.enabled);
    println!("  address: {}", service.config.server.bind_address());

    let conditions = service.monitor.get_conditions().await;
    println!("\nConditions ({}):", conditions.len());
    for info in conditions.values() {
        println!(
            "  {}: every {}s, {}{} - {}",
            info.name,
            info.check_interval,
            info.severity,
            if info.enabled { "" } else { " (disabled)" },
            info.description
        );
    }

    let resources = service.resources.get_all_resources().await;
    println!(
        "\nResources ({}) from {}:",
        resources.len(),
        service.resources.resource_dir().display()
    );
    for name in resources.keys() {
        println!("  {}", name);
    }

    println!("\nComponent types:");
    for type_name in service.components.list_component_types().await {
        println!("  {}", type_name);
    }

    Ok(())
}
