//! Submission driver: the round loop and its nonce/gas-price retry protocol

use super::batch::{build_batch, RoundPlan};
use super::gas::PriceSchedule;
use crate::chain::Ledger;
use crate::config::Settings;
use crate::error::{SubmitError, SubmitResult};
use crate::metrics;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, TxHash};
use futures::stream::{self, TryStreamExt};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Driver-owned round state, mutated only between rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    /// Nonce of the first transaction in the next batch.
    pub base_nonce: u64,
    pub schedule: PriceSchedule,
}

/// How one round resolved, after any resync read.
#[derive(Debug)]
pub enum Resolution {
    /// Every submission in the batch was accepted by the endpoint.
    Completed { batch_size: usize },
    /// The node rejected a submission (underpriced, pool saturated).
    Rejected(SubmitError),
    /// Transport or signing fault; carries the remote transaction count when
    /// the resync read succeeded.
    Faulted { remote_count: Option<u64> },
}

impl RoundState {
    /// The retry protocol: a pure transition from (state, resolution) to the
    /// next state.
    ///
    /// Completed rounds advance the base nonce by the batch size; rejections
    /// raise the floor and keep the nonce so the round is retried in place;
    /// faults reset the nonce to one past the remote transaction count.
    pub fn apply(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Completed { batch_size } => {
                self.base_nonce += *batch_size as u64;
            }
            Resolution::Rejected(_) => {
                self.schedule.raise_floor();
            }
            Resolution::Faulted {
                remote_count: Some(count),
            } => {
                self.base_nonce = count + 1;
            }
            Resolution::Faulted { remote_count: None } => {}
        }
    }
}

/// Drives batches of self-transfers against the ledger until the iteration
/// ceiling or an external stop.
pub struct SubmissionDriver<L: Ledger> {
    ledger: Arc<L>,
    wallet: LocalWallet,
    recipient: Address,
    settings: Settings,
    shutdown: Arc<RwLock<bool>>,
}

impl<L: Ledger> SubmissionDriver<L> {
    pub fn new(ledger: Arc<L>, wallet: LocalWallet, recipient: Address, settings: Settings) -> Self {
        Self {
            ledger,
            wallet,
            recipient,
            settings,
            shutdown: Arc::new(RwLock::new(false)),
        }
    }

    /// Seed the round state from the ledger: base nonce from the account's
    /// transaction count, floor from the inflated network price.
    async fn init_state(&self) -> SubmitResult<RoundState> {
        let count = self.ledger.transaction_count(self.wallet.address()).await?;
        let network_price = self.ledger.gas_price().await?;

        let schedule = PriceSchedule::seeded(
            network_price,
            &self.settings.gas.initial_factors,
            self.settings.gas.step_wei as u128,
        );

        Ok(RoundState {
            base_nonce: count + 1,
            schedule,
        })
    }

    /// Main submission loop
    pub async fn run(&self) -> SubmitResult<()> {
        let mut state = self.init_state().await?;
        let batch_size = self.settings.driver.batch_size;
        let workers = self.settings.driver.worker_count();

        info!(
            base_nonce = state.base_nonce,
            floor = state.schedule.floor(),
            batch_size,
            workers,
            "Submission driver started"
        );

        for round in 0..self.settings.driver.max_rounds {
            if *self.shutdown.read().await {
                info!("Shutdown flag set, stopping driver");
                break;
            }

            match self.run_round(&state, workers).await {
                Ok(()) => {
                    let resolution = Resolution::Completed { batch_size };
                    state.apply(&resolution);
                    metrics::record_round_completed(batch_size);
                    debug!(round, base_nonce = state.base_nonce, "Round completed");

                    tokio::time::sleep(Duration::from_millis(
                        self.settings.driver.round_delay_ms,
                    ))
                    .await;
                }
                Err(err) if err.is_rejection() => {
                    warn!(round, %err, "Batch rejected, raising gas-price floor");
                    state.apply(&Resolution::Rejected(err));
                    metrics::record_floor_raise();
                }
                Err(err) => {
                    error!(round, %err, "Round faulted, resynchronizing nonce");

                    let remote_count = match self
                        .ledger
                        .transaction_count(self.wallet.address())
                        .await
                    {
                        Ok(count) => Some(count),
                        Err(sync_err) => {
                            warn!(%sync_err, "Nonce resync failed, keeping local nonce");
                            None
                        }
                    };

                    state.apply(&Resolution::Faulted { remote_count });
                    metrics::record_nonce_resync();

                    tokio::time::sleep(Duration::from_millis(
                        self.settings.driver.fault_delay_ms,
                    ))
                    .await;
                }
            }

            metrics::set_round_state(state.base_nonce, state.schedule.floor());
        }

        info!("Submission driver stopped");
        Ok(())
    }

    /// Submit one batch concurrently, stopping at the first error.
    ///
    /// Per-item results of a completed batch are not inspected; the round
    /// reacts only to the first error the pool reports.
    async fn run_round(&self, state: &RoundState, workers: usize) -> SubmitResult<()> {
        let plan = RoundPlan {
            recipient: self.recipient,
            base_nonce: state.base_nonce,
            batch_size: self.settings.driver.batch_size,
            chain_id: self.settings.chain.chain_id,
        };
        let requests = build_batch(&plan, &state.schedule);

        stream::iter(requests.into_iter().map(Ok::<_, SubmitError>))
            .try_for_each_concurrent(workers, |request| async move {
                self.submit_one(request).await.map(|_| ())
            })
            .await
    }

    /// Sign and broadcast a single request.
    async fn submit_one(&self, request: TransactionRequest) -> SubmitResult<TxHash> {
        let tx = TypedTransaction::Legacy(request);
        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| SubmitError::Signing(e.to_string()))?;

        let hash = self.ledger.broadcast(tx.rlp_signed(&signature)).await?;
        trace!(?hash, "Transaction sent");
        Ok(hash)
    }

    /// Request a stop; takes effect between rounds.
    pub async fn stop(&self) {
        *self.shutdown.write().await = true;
        info!("Submission driver shutdown initiated");
    }
}
