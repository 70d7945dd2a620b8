use anyhow::Result;
use clap::{Parser, Subcommand};
use quant_dash_core::{AppConfig, ConfigLoader, SourceKind};
use quant_dash_feed::ServiceClient;
use quant_dash_orchestrator::{ViewConfig, ViewRegistry, ViewState};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quant-dash")]
#[command(about = "Market analytics reconciliation pipeline", long_about = None)]
struct Cli {
    /// Configuration profile (merges config/Config.<profile>.toml)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh cycle for a view and print the snapshot as JSON
    Snapshot {
        /// View identifier
        #[arg(long, default_value = "dashboard")]
        view: String,
        /// Restrict the forecast source to one symbol from the catalog
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Keep views refreshing on their timers and log state transitions
    Watch,
    /// Print the configured symbol catalog
    Symbols,
}

fn load_config(profile: Option<&str>) -> Result<AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.profile.as_deref())?;

    match cli.command {
        Commands::Snapshot { view, symbol } => snapshot(&config, view, symbol).await,
        Commands::Watch => watch(&config).await,
        Commands::Symbols => {
            for symbol in &config.refresh.symbols {
                println!("{symbol}");
            }
            Ok(())
        }
    }
}

fn registry(config: &AppConfig) -> ViewRegistry {
    let client = Arc::new(ServiceClient::new(config.service.base_url.clone()));
    ViewRegistry::new(client, config.pipeline.clone())
}

const DASHBOARD_SOURCES: &[SourceKind] = &[
    SourceKind::IndexHistory,
    SourceKind::Forecast,
    SourceKind::ModelScorecards,
    SourceKind::CircuitMetrics,
    SourceKind::LastUpdate,
];

async fn snapshot(config: &AppConfig, view: String, symbol: Option<String>) -> Result<()> {
    let registry = registry(config);
    let handle = registry
        .spawn_view(ViewConfig {
            view_id: view,
            symbol,
            sources: DASHBOARD_SOURCES.to_vec(),
            refresh_interval_secs: config.refresh.interval_secs,
        })
        .await?;

    // The first cycle starts on spawn; wait for it to settle.
    let mut rx = handle.subscribe();
    loop {
        {
            let snapshot = rx.borrow_and_update();
            if snapshot.cycle > 0 {
                println!("{}", serde_json::to_string_pretty(&**snapshot)?);
                break;
            }
        }
        rx.changed().await?;
    }

    registry.shutdown_all().await
}

async fn watch(config: &AppConfig) -> Result<()> {
    let registry = registry(config);

    let dashboard = registry
        .spawn_view(ViewConfig {
            view_id: "dashboard".to_string(),
            symbol: None,
            sources: DASHBOARD_SOURCES.to_vec(),
            refresh_interval_secs: config.refresh.interval_secs,
        })
        .await?;
    tokio::spawn(log_transitions(dashboard.subscribe()));

    for symbol in &config.refresh.symbols {
        let handle = registry
            .spawn_view(ViewConfig {
                view_id: format!("forecast/{symbol}"),
                symbol: Some(symbol.clone()),
                sources: vec![SourceKind::Forecast],
                refresh_interval_secs: config.refresh.interval_secs,
            })
            .await?;
        tokio::spawn(log_transitions(handle.subscribe()));
    }

    tracing::info!("watching; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    registry.shutdown_all().await
}

async fn log_transitions(
    mut rx: tokio::sync::watch::Receiver<Arc<quant_dash_orchestrator::ViewSnapshot>>,
) {
    while rx.changed().await.is_ok() {
        let snapshot = Arc::clone(&rx.borrow_and_update());
        if snapshot.state == ViewState::Fetching {
            continue;
        }
        let price = snapshot
            .derived
            .as_ref()
            .and_then(|d| d.current_price)
            .map_or_else(|| "n/a".to_string(), |p| p.round_dp(2).to_string());
        tracing::info!(
            view_id = %snapshot.view_id,
            cycle = snapshot.cycle,
            state = ?snapshot.state,
            %price,
            "snapshot published"
        );
    }
}
