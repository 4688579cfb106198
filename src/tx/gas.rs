//! Gas-price schedule: floor seeding, rejection raises, per-offset premiums

use ethers::types::U256;
use tracing::debug;

/// Gas-price floor with the per-offset premium used to bias inclusion order.
///
/// The floor only moves up: seeded from the network price at startup, raised
/// by 10% whenever the node rejects a batch. Every price handed out is the
/// floor plus a premium, so the floor is a true lower bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSchedule {
    /// Current floor in wei.
    floor: u128,
    /// Premium step in wei between adjacent offsets.
    step: u128,
}

impl PriceSchedule {
    /// Seed a schedule from the current network price, inflated by the
    /// configured factor chain.
    pub fn seeded(network_price: U256, factors: &[f64], step: u128) -> Self {
        let inflation: f64 = factors.iter().product();
        let floor = (network_price.as_u128() as f64 * inflation) as u128;
        debug!(floor, step, "seeded gas-price floor");
        Self { floor, step }
    }

    /// Raise the floor by 10%, in integer wei arithmetic.
    pub fn raise_floor(&mut self) {
        self.floor = self.floor * 11 / 10;
    }

    /// Current floor in wei.
    pub fn floor(&self) -> u128 {
        self.floor
    }

    /// Price for one offset within a batch of `n`.
    ///
    /// The premium shrinks by `step` per offset: offset 0 pays the most,
    /// the last offset pays exactly the floor.
    pub fn price_at(&self, offset: usize, n: usize) -> U256 {
        debug_assert!(offset < n);
        let premium = self.step * (n - 1 - offset) as u128;
        U256::from(self.floor + premium)
    }

    #[cfg(test)]
    pub fn with_floor(floor: u128, step: u128) -> Self {
        Self { floor, step }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_floor_from_factor_chain() {
        let schedule = PriceSchedule::seeded(U256::from(1_000u64), &[1.5, 2.0], 100);
        assert_eq!(schedule.floor(), 3_000);
    }

    #[test]
    fn empty_factor_chain_keeps_network_price() {
        let schedule = PriceSchedule::seeded(U256::from(1_000u64), &[], 100);
        assert_eq!(schedule.floor(), 1_000);
    }

    #[test]
    fn raise_floor_is_ten_percent() {
        let mut schedule = PriceSchedule::with_floor(100, 100);
        schedule.raise_floor();
        assert_eq!(schedule.floor(), 110);

        // truncating division, same rounding as int(x * 1.1)
        let mut schedule = PriceSchedule::with_floor(101, 100);
        schedule.raise_floor();
        assert_eq!(schedule.floor(), 111);
    }

    #[test]
    fn prices_decrease_by_step_down_to_floor() {
        let schedule = PriceSchedule::with_floor(10_000, 100);
        let n = 5;

        let prices: Vec<U256> = (0..n).map(|i| schedule.price_at(i, n)).collect();
        for pair in prices.windows(2) {
            assert_eq!(pair[0] - pair[1], U256::from(100u64));
        }
        assert_eq!(prices[n - 1], U256::from(schedule.floor()));
        assert!(prices.iter().all(|p| *p >= U256::from(schedule.floor())));
    }

    #[test]
    fn single_item_batch_pays_the_floor() {
        let schedule = PriceSchedule::with_floor(10_000, 100);
        assert_eq!(schedule.price_at(0, 1), U256::from(10_000u64));
    }
}
