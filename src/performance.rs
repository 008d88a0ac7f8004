// Scheduler tick timing
use crate::config::keys;
use crate::dashboard::Dashboard;
use crate::stats::RunningStats;

/// Wall time of each control tick
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceMonitor {
    stats: RunningStats,
    last: f64,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_measurement(&mut self, secs: f64) {
        self.last = secs;
        self.stats.add(secs);
    }

    pub fn reset(&mut self) {
        self.last = 0.0;
        self.stats.zero();
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    pub fn publish(&self, dashboard: &mut dyn Dashboard) {
        dashboard.put_number(keys::RUN_LAST, self.last);
        dashboard.put_number(keys::RUN_AVG, self.stats.average());
        dashboard.put_number(keys::RUN_MAX, self.stats.max());
    }
}
