//! Learned bowden lengths.

mod bowden;
mod history;
mod moving_average;

pub use bowden::{BowdenLengthEstimate, BowdenSample};
pub use history::BowdenHistory;
pub use moving_average::MovingAverageFilter;
