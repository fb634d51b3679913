//! Bowden length estimator for one direction.

use tradrack_types::BowdenLengthStats;

use super::MovingAverageFilter;

/// Outcome of feeding one measured length into a [`BowdenLengthEstimate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BowdenSample {
    /// Measured length
    pub length: f64,
    /// Set length before the sample
    pub old_set_length: f64,
    /// Set length after the sample
    pub new_set_length: f64,
    pub sample_count: usize,
    /// This sample is the one that marked the estimate calibrated
    pub newly_calibrated: bool,
}

impl BowdenSample {
    pub fn diff_from_set_length(&self) -> f64 {
        self.length - self.old_set_length
    }

    pub const fn stats(&self) -> BowdenLengthStats {
        BowdenLengthStats { new_set_length: self.new_set_length, sample_count: self.sample_count }
    }
}

/// Learned bowden length for one direction (load or unload).
///
/// Starts at the configured length. Every measured sample moves the set length
/// to the moving average of recent samples. The estimate only counts as
/// calibrated once a sample was taken with the sensor triggering where it was
/// expected; a sensor that fires during the transit move means the set length
/// overshoots and the measurement is partial.
#[derive(Debug, Clone)]
pub struct BowdenLengthEstimate {
    filter: MovingAverageFilter,
    config_length: f64,
    length: f64,
    calibrated: bool,
}

impl BowdenLengthEstimate {
    pub fn new(config_length: f64, window: usize) -> Self {
        Self {
            filter: MovingAverageFilter::new(window),
            config_length,
            length: config_length,
            calibrated: false,
        }
    }

    pub const fn length(&self) -> f64 {
        self.length
    }

    pub const fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn sample_count(&self) -> usize {
        self.filter.sample_count()
    }

    pub fn record_sample(&mut self, length: f64, reached_early: bool) -> BowdenSample {
        let old_set_length = self.length;
        self.length = self.filter.update(length);
        let newly_calibrated = !(self.calibrated || reached_early);
        if newly_calibrated {
            self.calibrated = true;
        }

        BowdenSample {
            length,
            old_set_length,
            new_set_length: self.length,
            sample_count: self.filter.sample_count(),
            newly_calibrated,
        }
    }

    /// Rebuild the filter from saved stats by replaying the saved mean.
    pub fn restore(&mut self, stats: &BowdenLengthStats) {
        self.filter.reset();
        self.length = stats.new_set_length;
        for _ in 0..stats.sample_count.min(self.filter.window()) {
            self.filter.update(stats.new_set_length);
        }
    }

    /// Forget every sample and return to the configured length.
    pub fn discard(&mut self) {
        self.filter.reset();
        self.length = self.config_length;
        self.calibrated = false;
    }

    pub fn stats(&self) -> BowdenLengthStats {
        BowdenLengthStats { new_set_length: self.length, sample_count: self.filter.sample_count() }
    }
}
