//! Chain module - JSON-RPC endpoint access
//!
//! Provides the ledger operations the driver depends on: account transaction
//! count, network gas price, and raw transaction broadcast, over one or more
//! HTTP endpoints with automatic failover.

pub mod provider;

pub use provider::{ChainProvider, Ledger};
