//! Batch construction for one round of self-transfers

use super::gas::PriceSchedule;
use ethers::types::{Address, Bytes, TransactionRequest, U256};

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Parameters for one round's batch.
#[derive(Debug, Clone)]
pub struct RoundPlan {
    pub recipient: Address,
    pub base_nonce: u64,
    pub batch_size: usize,
    pub chain_id: u64,
}

/// Build the requests for one round.
///
/// Nonces are contiguous starting at the base; prices decrease by the
/// schedule step so earlier offsets are favored for inclusion. Requests are
/// zero-value transfers with an empty payload, signed as legacy transactions.
pub fn build_batch(plan: &RoundPlan, schedule: &PriceSchedule) -> Vec<TransactionRequest> {
    (0..plan.batch_size)
        .map(|offset| {
            TransactionRequest::new()
                .to(plan.recipient)
                .value(U256::zero())
                .data(Bytes::default())
                .gas(TRANSFER_GAS_LIMIT)
                .gas_price(schedule.price_at(offset, plan.batch_size))
                .nonce(plan.base_nonce + offset as u64)
                .chain_id(plan.chain_id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn plan(batch_size: usize) -> RoundPlan {
        RoundPlan {
            recipient: Address::repeat_byte(0x42),
            base_nonce: 700,
            batch_size,
            chain_id: 245022926,
        }
    }

    #[test]
    fn nonces_are_contiguous_and_unique() {
        let schedule = PriceSchedule::with_floor(10_000, 100);
        let batch = build_batch(&plan(50), &schedule);

        let nonces: HashSet<u64> = batch
            .iter()
            .map(|tx| tx.nonce.unwrap().as_u64())
            .collect();
        assert_eq!(nonces.len(), 50);
        assert_eq!(nonces, (700..750).collect::<HashSet<u64>>());
    }

    #[test]
    fn prices_decrease_and_never_drop_below_floor() {
        let schedule = PriceSchedule::with_floor(10_000, 100);
        let batch = build_batch(&plan(50), &schedule);

        let prices: Vec<U256> = batch.iter().map(|tx| tx.gas_price.unwrap()).collect();
        for pair in prices.windows(2) {
            assert!(pair[0] > pair[1]);
            assert_eq!(pair[0] - pair[1], U256::from(100u64));
        }
        assert_eq!(*prices.last().unwrap(), U256::from(schedule.floor()));
    }

    #[test]
    fn requests_are_zero_value_transfers() {
        let schedule = PriceSchedule::with_floor(10_000, 100);
        let batch = build_batch(&plan(3), &schedule);

        for tx in &batch {
            assert_eq!(tx.value.unwrap(), U256::zero());
            assert_eq!(tx.gas.unwrap(), U256::from(TRANSFER_GAS_LIMIT));
            assert_eq!(tx.chain_id.unwrap().as_u64(), 245022926);
            assert!(tx.data.as_ref().map(|d| d.is_empty()).unwrap_or(true));
        }
    }
}
