use anyhow::{Context, Result};
use dagit::config::{load_config, DagitConfig};
use dagit::transport::TungsteniteConnector;
use dagit::{bootstrap, Document, FetchPolicy, Operation};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "dagit.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dagit=info".into()),
        )
        .init();

    info!("Dagit starting...");

    let mut config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).with_context(|| format!("Failed to load {}", path))?,
        None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(DEFAULT_CONFIG_PATH).context("Failed to load dagit.toml")?
        }
        None => {
            info!("No config file found, using defaults");
            DagitConfig::default()
        }
    };
    config.apply_env_overrides();

    let mut document = Document::with_root(&config.app.mount_root);
    let dashboard = bootstrap(&config, &mut document, Arc::new(TungsteniteConnector))?;

    if let Some(query) = config.app.startup_query.clone() {
        let client = dashboard.client.clone();
        tokio::spawn(async move {
            match client.query(Operation::new(query), FetchPolicy::NetworkOnly).await {
                Ok(result) => info!(
                    data = %result.data.unwrap_or_default(),
                    errors = result.errors.len(),
                    "Startup query finished"
                ),
                Err(e) => warn!(error = %e, "Startup query failed"),
            }
        });
    }

    // First item is the current status, then one per transition
    let mut updates = dashboard.status.handle().stream();
    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(snapshot) = update else { break };
                dashboard.app.refresh(&mut document)?;
                info!(status = %snapshot.status, "Connection status");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    dashboard.websocket.close();
    Ok(())
}
