// Running statistics accumulator (count, sum, min, max)
// O(1) per sample, no allocation. Used by the calibration workload and the
// per-tick performance monitor.

/// Tracks count, sum, min and max of a stream of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all samples
    pub fn zero(&mut self) {
        *self = Self::default();
    }

    /// Add a sample
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else if value > self.max {
            self.max = value;
        } else if value < self.min {
            self.min = value;
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Mean of all samples, 0.0 when empty
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}
