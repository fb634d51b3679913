//! Bounded-window running average.

use std::collections::VecDeque;

/// Mean of the last `window` samples.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    window: usize,
    samples: VecDeque<f64>,
    sum: f64,
}

impl MovingAverageFilter {
    /// A window of zero is treated as one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self { window, samples: VecDeque::with_capacity(window), sum: 0.0 }
    }

    /// Add a sample and return the new mean.
    pub fn update(&mut self, value: f64) -> f64 {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(value);
        self.sum += value;
        self.sum / self.samples.len() as f64
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub const fn window(&self) -> usize {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_evicts_oldest_sample() {
        let mut filter = MovingAverageFilter::new(3);
        filter.update(1.0);
        filter.update(2.0);
        filter.update(3.0);
        let mean = filter.update(10.0);

        assert_eq!(filter.sample_count(), 3);
        assert!(approx_eq(mean, 5.0));
    }

    #[test]
    fn test_zero_window_acts_as_one() {
        let mut filter = MovingAverageFilter::new(0);
        filter.update(4.0);
        assert!(approx_eq(filter.update(9.0), 9.0));
        assert_eq!(filter.window(), 1);
    }

    proptest! {
        #[test]
        fn prop_reset_then_update_returns_value(
            window in 1_usize..20,
            values in prop::collection::vec(-1000.0_f64..1000.0, 0..50),
            next in -1000.0_f64..1000.0,
        ) {
            let mut filter = MovingAverageFilter::new(window);
            for v in &values {
                filter.update(*v);
            }
            filter.reset();
            prop_assert_eq!(filter.sample_count(), 0);
            prop_assert!(approx_eq(filter.update(next), next));
        }

        #[test]
        fn prop_mean_of_last_window_values(
            window in 1_usize..20,
            values in prop::collection::vec(0.0_f64..2000.0, 1..80),
        ) {
            let mut filter = MovingAverageFilter::new(window);
            let mut mean = 0.0;
            for v in &values {
                mean = filter.update(*v);
            }
            let tail = &values[values.len().saturating_sub(window)..];
            let expected = tail.iter().sum::<f64>() / tail.len() as f64;

            prop_assert_eq!(filter.sample_count(), tail.len());
            prop_assert!(approx_eq(mean, expected));
        }
    }
}
