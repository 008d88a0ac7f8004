// Distance, rotation and acceleration measurement relative to a baseline
//
// Zeroes every time it is (re)started. Only reads sensors, so it does not own
// the drive and keeps running while disabled.

use tracing::info;

use super::{DriveCommand, TickContext};
use crate::config::{keys, BUMP_THRESHOLD_X, BUMP_THRESHOLD_Y};
use crate::dashboard::Dashboard;
use crate::drive::DriveSnapshot;

/// Sensor values captured when measurement starts
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeasurementBaseline {
    pub yaw: f64,
    pub left_distance: f64,
    pub left_counts: i64,
    pub right_distance: f64,
    pub right_counts: i64,
}

impl MeasurementBaseline {
    /// Both tread baselines come from their own side
    pub fn capture(snapshot: &DriveSnapshot) -> Self {
        Self {
            yaw: snapshot.yaw,
            left_distance: snapshot.left.distance,
            left_counts: snapshot.left.counts,
            right_distance: snapshot.right.distance,
            right_counts: snapshot.right.counts,
        }
    }
}

/// One tick's report
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    pub yaw_raw: f64,
    pub yaw: f64,
    pub left_distance: f64,
    pub left_counts: i64,
    pub left_velocity: f64,
    pub right_distance: f64,
    pub right_counts: i64,
    pub right_velocity: f64,
    pub accel_x: f64,
    pub accel_y: f64,
    pub bump: bool,
}

impl Measurement {
    pub fn publish(&self, dashboard: &mut dyn Dashboard) {
        dashboard.put_number(keys::YAW_RAW, self.yaw_raw);
        dashboard.put_number(keys::YAW_MEASURED, self.yaw);
        dashboard.put_number(keys::LEFT_DIST, self.left_distance);
        dashboard.put_number(keys::LEFT_CNTS, self.left_counts as f64);
        dashboard.put_number(keys::LEFT_VEL, self.left_velocity);
        dashboard.put_number(keys::RIGHT_DIST, self.right_distance);
        dashboard.put_number(keys::RIGHT_CNTS, self.right_counts as f64);
        dashboard.put_number(keys::RIGHT_VEL, self.right_velocity);
        dashboard.put_number(keys::ACCEL_X, self.accel_x);
        dashboard.put_number(keys::ACCEL_Y, self.accel_y);
        dashboard.put_bool(keys::BUMP, self.bump);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MeasurementTracker {
    baseline: MeasurementBaseline,
    bump_x: f64,
    bump_y: f64,
}

impl Default for MeasurementTracker {
    fn default() -> Self {
        Self::new(BUMP_THRESHOLD_X, BUMP_THRESHOLD_Y)
    }
}

impl MeasurementTracker {
    pub fn new(bump_x: f64, bump_y: f64) -> Self {
        Self {
            baseline: MeasurementBaseline::default(),
            bump_x,
            bump_y,
        }
    }

    pub fn baseline(&self) -> &MeasurementBaseline {
        &self.baseline
    }

    /// Zero all deltas at the current sensor values
    pub fn activate(&mut self, snapshot: &DriveSnapshot) {
        self.baseline = MeasurementBaseline::capture(snapshot);
    }

    pub fn measure(&self, snapshot: &DriveSnapshot) -> Measurement {
        let b = &self.baseline;
        Measurement {
            yaw_raw: snapshot.yaw,
            yaw: snapshot.yaw - b.yaw,
            left_distance: snapshot.left.distance - b.left_distance,
            left_counts: snapshot.left.counts - b.left_counts,
            left_velocity: snapshot.left.velocity,
            right_distance: snapshot.right.distance - b.right_distance,
            right_counts: snapshot.right.counts - b.right_counts,
            right_velocity: snapshot.right.velocity,
            accel_x: snapshot.accel_x,
            accel_y: snapshot.accel_y,
            bump: snapshot.bump_check(self.bump_x, self.bump_y),
        }
    }
}

/// Publishes a measurement every tick until cancelled
#[derive(Debug, Default)]
pub struct MeasureCommand {
    tracker: MeasurementTracker,
}

impl MeasureCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriveCommand for MeasureCommand {
    fn name(&self) -> &str {
        "Measure"
    }

    fn requires_drive(&self) -> bool {
        false
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        let snapshot = ctx.drive.snapshot();
        self.tracker.activate(&snapshot);
        info!("Measurement zeroed at {:?}", self.tracker.baseline());
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        let snapshot = ctx.drive.snapshot();
        self.tracker.measure(&snapshot).publish(ctx.dashboard);
    }

    fn is_finished(&self) -> bool {
        false
    }

    // Never touches the actuators
    fn end(&mut self, _ctx: &mut TickContext<'_>) {}
}
