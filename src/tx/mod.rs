//! Transaction submission: batch construction, price schedule, round driver

mod batch;
mod driver;
mod gas;

pub use batch::{build_batch, RoundPlan, TRANSFER_GAS_LIMIT};
pub use driver::{Resolution, RoundState, SubmissionDriver};
pub use gas::PriceSchedule;
