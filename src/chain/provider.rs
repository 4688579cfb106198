//! Chain provider with multi-RPC support and automatic failover

use crate::config::ChainConfig;
use crate::error::{SubmitError, SubmitResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, TxHash, U256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Ledger operations the submission driver depends on.
///
/// Broadcast errors keep their two-way classification; the read operations
/// always surface as transport errors because a rejection only makes sense
/// for a submitted transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Number of transactions the ledger has accepted from `address`.
    async fn transaction_count(&self, address: Address) -> SubmitResult<u64>;

    /// Current network gas price in wei.
    async fn gas_price(&self) -> SubmitResult<U256>;

    /// Broadcast a signed raw transaction, returning its hash.
    async fn broadcast(&self, raw: Bytes) -> SubmitResult<TxHash>;
}

/// Multi-provider wrapper with automatic failover on the read paths
pub struct ChainProvider {
    config: ChainConfig,
    http_providers: Vec<Provider<Http>>,
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(config: ChainConfig) -> SubmitResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(SubmitError::Transport(
                "No valid RPC providers".to_string(),
            ));
        }

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!(
            "Chain {} failover to provider {}",
            self.config.chain_id, next
        );
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }
}

#[async_trait]
impl Ledger for ChainProvider {
    async fn transaction_count(&self, address: Address) -> SubmitResult<u64> {
        let mut last_error = None;

        for _ in 0..self.http_providers.len() {
            match self.http().get_transaction_count(address, None).await {
                Ok(count) => return Ok(count.as_u64()),
                Err(e) => {
                    warn!(
                        "Failed to get transaction count from chain {}: {}",
                        self.config.chain_id, e
                    );
                    last_error = Some(e.to_string());
                    self.failover();
                }
            }
        }

        Err(SubmitError::Transport(last_error.unwrap_or_else(|| {
            "All providers failed to get transaction count".to_string()
        })))
    }

    async fn gas_price(&self) -> SubmitResult<U256> {
        let mut last_error = None;

        for _ in 0..self.http_providers.len() {
            match self.http().get_gas_price().await {
                Ok(price) => return Ok(price),
                Err(e) => {
                    warn!(
                        "Failed to get gas price from chain {}: {}",
                        self.config.chain_id, e
                    );
                    last_error = Some(e.to_string());
                    self.failover();
                }
            }
        }

        Err(SubmitError::Transport(last_error.unwrap_or_else(|| {
            "All providers failed to get gas price".to_string()
        })))
    }

    async fn broadcast(&self, raw: Bytes) -> SubmitResult<TxHash> {
        let pending = self
            .http()
            .send_raw_transaction(raw)
            .await
            .map_err(SubmitError::from)?;
        Ok(pending.tx_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_config(rpc_urls: Vec<String>) -> ChainConfig {
        ChainConfig {
            chain_id: 245022926,
            rpc_urls,
            recipient: None,
        }
    }

    #[test]
    fn rejects_empty_provider_list() {
        let result = ChainProvider::new(chain_config(vec![]));
        assert!(matches!(result, Err(SubmitError::Transport(_))));
    }

    #[test]
    fn skips_invalid_urls() {
        let provider = ChainProvider::new(chain_config(vec![
            "not a url".to_string(),
            "https://rpc.example.org".to_string(),
        ]))
        .unwrap();
        assert_eq!(provider.http_providers.len(), 1);
        assert_eq!(provider.chain_id(), 245022926);
    }
}
