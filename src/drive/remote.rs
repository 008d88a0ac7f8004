// Drive base reached over the network
//
// Power and neutral mode are only recorded here; the runtime publishes them
// as actuation every tick. Sensor values arrive as snapshots from the base.

use std::time::{Duration, Instant};

use super::{DriveError, DriveSnapshot, Drivetrain, NeutralMode, Result, TreadPower};

#[derive(Debug, Clone, Default)]
pub struct RemoteDrivetrain {
    power: TreadPower,
    neutral: NeutralMode,
    snapshot: DriveSnapshot,
    snapshot_at: Option<Instant>,
}

impl RemoteDrivetrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest sensor values reported by the base
    pub fn update_snapshot(&mut self, snapshot: DriveSnapshot) {
        self.snapshot = snapshot;
        self.snapshot_at = Some(Instant::now());
    }

    /// Time since the last sensor snapshot, None if never received
    pub fn snapshot_age(&self) -> Option<Duration> {
        self.snapshot_at.map(|t| t.elapsed())
    }
}

impl Drivetrain for RemoteDrivetrain {
    fn set_power(&mut self, power: TreadPower) -> Result<()> {
        for (side, value) in [("left", power.left), ("right", power.right)] {
            if !value.is_finite() {
                return Err(DriveError::InvalidPower { side, power: value });
            }
        }
        self.power = TreadPower::new(power.left.clamp(-1.0, 1.0), power.right.clamp(-1.0, 1.0));
        Ok(())
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<()> {
        self.neutral = mode;
        Ok(())
    }

    fn applied_power(&self) -> TreadPower {
        self.power
    }

    fn neutral_mode(&self) -> NeutralMode {
        self.neutral
    }

    fn snapshot(&self) -> DriveSnapshot {
        self.snapshot
    }
}
