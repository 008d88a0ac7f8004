// CPU load calibration
//
// Sizes a CPU bound workload by doubling until a run takes longer than the
// target, then reports loops per second. Gives up after a fixed number of
// attempts so noisy timing cannot keep it running forever.

use std::hint::black_box;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{DriveCommand, TickContext};
use crate::config::{keys, CALIBRATION_MAX_ATTEMPTS, CALIBRATION_TARGET_SECS};
use crate::dashboard::Dashboard;
use crate::stats::RunningStats;

/// Something whose run time grows with `loop_count`
pub trait Workload {
    /// Run at the given size and return the elapsed seconds
    fn run(&mut self, loop_count: u64) -> f64;
}

impl<F> Workload for F
where
    F: FnMut(u64) -> f64,
{
    fn run(&mut self, loop_count: u64) -> f64 {
        self(loop_count)
    }
}

/// Integer and transcendental arithmetic feeding a RunningStats
#[derive(Debug, Default)]
pub struct CpuWorkload {
    stats: RunningStats,
}

impl CpuWorkload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    pub fn reset(&mut self) {
        self.stats.zero();
    }

    /// The measured routine. Inner integer loop grows with `i`, so total
    /// work is roughly quadratic in `cnt`.
    pub fn run_test(&mut self, cnt: u64) -> f64 {
        let mut accum = 0.0;
        for i in 0..cnt {
            let n = i / 4;
            for j in 0..n {
                let mut x = (((j >> 3) + 1) * 7 / 8) as i64;
                if j % 4 == 0 {
                    x = -x;
                }
                self.stats.add(x as f64);
            }
            let ratio = i as f64 / cnt as f64;
            accum += ratio.sin();
            accum += std::f64::consts::PI.powf(ratio);
            accum += ratio.cos();
            self.stats.add(accum);
        }
        accum
    }
}

impl Workload for CpuWorkload {
    fn run(&mut self, loop_count: u64) -> f64 {
        let start = Instant::now();
        black_box(self.run_test(black_box(loop_count)));
        start.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Seeking,
    Converged,
    Exhausted,
}

/// Exponential search for the workload size that just crosses the target time
#[derive(Debug)]
pub struct CalibrationLoop<W> {
    workload: W,
    target_secs: f64,
    max_attempts: u32,
    loop_count: u64,
    last_run_secs: f64,
    previous_below: bool,
    attempts: u32,
    phase: CalibrationPhase,
}

impl<W: Workload> CalibrationLoop<W> {
    pub fn new(workload: W) -> Self {
        Self::with_limits(workload, CALIBRATION_TARGET_SECS, CALIBRATION_MAX_ATTEMPTS)
    }

    pub fn with_limits(workload: W, target_secs: f64, max_attempts: u32) -> Self {
        Self {
            workload,
            target_secs,
            max_attempts: max_attempts.max(1),
            loop_count: 1,
            last_run_secs: 0.0,
            previous_below: false,
            attempts: 0,
            phase: CalibrationPhase::Seeking,
        }
    }

    /// Start a new search from a single loop
    pub fn reset(&mut self) {
        self.loop_count = 1;
        self.last_run_secs = 0.0;
        self.previous_below = false;
        self.attempts = 0;
        self.phase = CalibrationPhase::Seeking;
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Size of the next attempt, or of the converged run once done
    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    pub fn last_run_secs(&self) -> f64 {
        self.last_run_secs
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn workload(&self) -> &W {
        &self.workload
    }

    pub fn workload_mut(&mut self) -> &mut W {
        &mut self.workload
    }

    /// Loops per second of the last run, 0.0 if it took no measurable time
    pub fn throughput_hz(&self) -> f64 {
        if self.last_run_secs > 0.0 {
            self.loop_count as f64 / self.last_run_secs
        } else {
            0.0
        }
    }

    /// Run the workload once at the current size and update the search
    pub fn attempt(&mut self) -> CalibrationPhase {
        if self.phase != CalibrationPhase::Seeking {
            return self.phase;
        }

        self.attempts += 1;
        let secs = self.workload.run(self.loop_count);
        self.last_run_secs = secs;
        debug!(
            "Calibration attempt {}: {} loops in {:.6}s",
            self.attempts, self.loop_count, secs
        );

        if secs > self.target_secs {
            if self.previous_below {
                self.phase = CalibrationPhase::Converged;
                return self.phase;
            }
            self.previous_below = false;
            self.loop_count = (self.loop_count / 2).max(1);
        } else {
            self.previous_below = true;
            self.loop_count = self.loop_count.saturating_mul(2);
        }

        if self.attempts >= self.max_attempts {
            warn!(
                "Calibration gave up after {} attempts at {} loops",
                self.attempts, self.loop_count
            );
            self.phase = CalibrationPhase::Exhausted;
        }
        self.phase
    }

    /// Attempt until converged or out of attempts
    pub fn run_to_completion(&mut self) -> CalibrationPhase {
        while self.attempt() == CalibrationPhase::Seeking {}
        self.phase
    }
}

/// Runs one calibration attempt per tick and publishes the result
#[derive(Debug)]
pub struct CalibrationCommand {
    calibration: CalibrationLoop<CpuWorkload>,
}

impl Default for CalibrationCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationCommand {
    pub fn new() -> Self {
        Self {
            calibration: CalibrationLoop::new(CpuWorkload::new()),
        }
    }

    pub fn calibration(&self) -> &CalibrationLoop<CpuWorkload> {
        &self.calibration
    }
}

impl DriveCommand for CalibrationCommand {
    fn name(&self) -> &str {
        "LoadTest"
    }

    fn requires_drive(&self) -> bool {
        false
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) {
        self.calibration.reset();
        self.calibration.workload_mut().reset();
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        ctx.dashboard
            .put_number(keys::CPU_LOOPS, self.calibration.loop_count() as f64);
        self.calibration.attempt();
    }

    fn is_finished(&self) -> bool {
        self.calibration.phase() != CalibrationPhase::Seeking
    }

    fn end(&mut self, ctx: &mut TickContext<'_>) {
        let secs = self.calibration.last_run_secs();
        let hz = self.calibration.throughput_hz();
        ctx.dashboard.put_number(keys::CPU_SECS, secs);
        ctx.dashboard.put_number(keys::CPU_HZ, hz);
        info!(
            "Calibration {:?}: {} loops, {:.4}s, {:.0} Hz",
            self.calibration.phase(),
            self.calibration.loop_count(),
            secs,
            hz
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_timing_converges_at_131072() {
        let mut sizes = Vec::new();
        let mut cal = CalibrationLoop::new(|n: u64| {
            sizes.push(n);
            n as f64 * 1e-6
        });

        assert_eq!(cal.run_to_completion(), CalibrationPhase::Converged);
        assert_eq!(cal.loop_count(), 131072);
        assert!((cal.last_run_secs() - 0.131072).abs() < 1e-12);
        assert!((cal.throughput_hz() - 1e6).abs() < 1e-3);
        assert_eq!(cal.attempts(), 18);
        drop(cal);

        let expected: Vec<u64> = (0..=17).map(|k| 1u64 << k).collect();
        assert_eq!(sizes, expected);
    }

    #[test]
    fn test_needs_prior_below_before_converging() {
        // Too slow, too slow (halving), fast enough, too slow -> converge
        let times = [0.5, 0.2, 0.05, 0.3];
        let mut idx = 0;
        let mut cal = CalibrationLoop::with_limits(
            move |_n: u64| {
                let t = times[idx.min(times.len() - 1)];
                idx += 1;
                t
            },
            0.1,
            24,
        );
        cal.reset();

        assert_eq!(cal.attempt(), CalibrationPhase::Seeking);
        assert_eq!(cal.loop_count(), 1, "halving never drops below one loop");
        assert_eq!(cal.attempt(), CalibrationPhase::Seeking);
        assert_eq!(cal.attempt(), CalibrationPhase::Seeking);
        assert_eq!(cal.loop_count(), 2);
        assert_eq!(cal.attempt(), CalibrationPhase::Converged);
        assert_eq!(cal.loop_count(), 2);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let mut cal = CalibrationLoop::new(|_n: u64| {
            calls += 1;
            0.0
        });
        assert_eq!(cal.run_to_completion(), CalibrationPhase::Exhausted);
        assert_eq!(cal.attempts(), CALIBRATION_MAX_ATTEMPTS);
        // Zero duration never divides by zero
        assert_eq!(cal.throughput_hz(), 0.0);
        // Further attempts are no-ops
        assert_eq!(cal.attempt(), CalibrationPhase::Exhausted);
        drop(cal);
        assert_eq!(calls, CALIBRATION_MAX_ATTEMPTS);
    }

    #[test]
    fn test_reset_restarts_search() {
        let mut cal = CalibrationLoop::new(|n: u64| n as f64 * 1e-6);
        cal.run_to_completion();
        cal.reset();
        assert_eq!(cal.phase(), CalibrationPhase::Seeking);
        assert_eq!(cal.loop_count(), 1);
        assert_eq!(cal.attempts(), 0);
        assert_eq!(cal.throughput_hz(), 0.0);
    }

    #[test]
    fn test_cpu_workload_sample_count() {
        let mut work = CpuWorkload::new();
        assert_eq!(work.run_test(0), 0.0);
        assert_eq!(work.stats().count(), 0);

        // i / 4 inner samples for i in 0..8, plus one per outer loop
        work.run_test(8);
        assert_eq!(work.stats().count(), 12);

        work.reset();
        work.run_test(64);
        let big = work.stats().count();
        work.reset();
        work.run_test(32);
        assert!(big > work.stats().count());
    }

    #[test]
    fn test_cpu_workload_times_runs() {
        let mut work = CpuWorkload::new();
        let secs = work.run(256);
        println!("256 loops took {:.6}s", secs);
        assert!(secs >= 0.0);
    }
}
