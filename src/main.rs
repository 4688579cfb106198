//! firehose - self-transfer load driver for EVM JSON-RPC endpoints
//!
//! Repeatedly submits batches of zero-value self-transfers, raising the
//! gas-price floor when the node rejects a batch and resynchronizing the
//! nonce from the chain on transport faults.

use anyhow::{Context, Result};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod chain;
mod config;
mod error;
mod metrics;
mod tx;

use chain::ChainProvider;
use config::Settings;
use metrics::MetricsServer;
use tx::SubmissionDriver;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    let instance_id = uuid::Uuid::new_v4();
    info!("Starting firehose v{} ({})", env!("CARGO_PKG_VERSION"), instance_id);

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration: chain {} via {} RPC endpoint(s)",
        settings.chain.chain_id,
        settings.chain.rpc_urls.len()
    );

    // Load wallet and resolve the transfer recipient
    let wallet = load_wallet(&settings)?.with_chain_id(settings.chain.chain_id);
    let recipient = match &settings.chain.recipient {
        Some(addr) => addr
            .parse::<Address>()
            .context("Invalid recipient address")?,
        None => wallet.address(),
    };
    info!("Submitting from {:?} to {:?}", wallet.address(), recipient);

    // Initialize chain provider
    let provider = Arc::new(ChainProvider::new(settings.chain.clone())?);
    info!("Chain provider initialized for chain {}", provider.chain_id());

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start the submission driver
    let driver = Arc::new(SubmissionDriver::new(
        provider,
        wallet,
        recipient,
        settings.clone(),
    ));
    let mut driver_handle = tokio::spawn({
        let driver = driver.clone();
        async move { driver.run().await }
    });

    info!("firehose is running");
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping...");
            driver.stop().await;
            let _ = driver_handle.await;
        }
        res = &mut driver_handle => {
            res.context("Submission driver task failed")??;
        }
    }

    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("firehose stopped");
    Ok(())
}

/// Load the wallet from the environment variable named in the config
fn load_wallet(settings: &Settings) -> Result<LocalWallet> {
    let var = &settings.wallet.private_key_env;
    let key = std::env::var(var)
        .with_context(|| format!("No wallet configured. Set {}", var))?;

    key.parse::<LocalWallet>()
        .context("Invalid private key")
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,firehose=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
