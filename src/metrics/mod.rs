//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Round and submission counts
//! - Retry-protocol activity (floor raises, nonce resyncs)
//! - Current round state (base nonce, gas-price floor)

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{register_counter, register_gauge, Counter, Encoder, Gauge, TextEncoder};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref ROUNDS_COMPLETED: Counter = register_counter!(
        "firehose_rounds_completed_total",
        "Total rounds in which the whole batch was accepted"
    )
    .unwrap();

    pub static ref TX_SUBMITTED: Counter = register_counter!(
        "firehose_transactions_submitted_total",
        "Total transactions accepted by the endpoint"
    )
    .unwrap();

    pub static ref FLOOR_RAISES: Counter = register_counter!(
        "firehose_gas_floor_raises_total",
        "Total gas-price floor raises after rejections"
    )
    .unwrap();

    pub static ref NONCE_RESYNCS: Counter = register_counter!(
        "firehose_nonce_resyncs_total",
        "Total nonce resynchronizations after faults"
    )
    .unwrap();

    pub static ref GAS_FLOOR_WEI: Gauge = register_gauge!(
        "firehose_gas_floor_wei",
        "Current gas-price floor in wei"
    )
    .unwrap();

    pub static ref BASE_NONCE: Gauge = register_gauge!(
        "firehose_base_nonce",
        "Nonce of the first transaction in the next batch"
    )
    .unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

// Helper functions to record metrics

pub fn record_round_completed(batch_size: usize) {
    ROUNDS_COMPLETED.inc();
    TX_SUBMITTED.inc_by(batch_size as f64);
}

pub fn record_floor_raise() {
    FLOOR_RAISES.inc();
}

pub fn record_nonce_resync() {
    NONCE_RESYNCS.inc();
}

pub fn set_round_state(base_nonce: u64, floor_wei: u128) {
    BASE_NONCE.set(base_nonce as f64);
    GAS_FLOOR_WEI.set(floor_wei as f64);
}
