// Drive module for the two-tread base
//
// Provides:
// - Differential-drive kinematics (arcade, tank, curvature blends)
// - The drivetrain collaborator interface (power out, sensor snapshot in)
// - A simulated drivetrain for bench runs and tests, and a remote one for the real base

pub mod kinematics;
mod remote;
mod sim;

pub use kinematics::{CurvatureDrive, TreadPower};
pub use remote::RemoteDrivetrain;
pub use sim::{SimConfig, SimDrivetrain};

use serde::{Deserialize, Serialize};

/// Error types for drivetrain access
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Invalid power {power} for {side} tread")]
    InvalidPower { side: &'static str, power: f64 },

    #[error("Actuator fault: {0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, DriveError>;

/// What the motor controllers do when commanded power is 0.0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeutralMode {
    #[default]
    Coast,
    Brake,
}

impl NeutralMode {
    pub fn from_brake(enable: bool) -> Self {
        if enable {
            NeutralMode::Brake
        } else {
            NeutralMode::Coast
        }
    }
}

/// Encoder values last read from one side of the drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TreadReading {
    /// Distance travelled in feet
    pub distance: f64,
    /// Raw encoder counts
    pub counts: i64,
    /// Velocity in ft/sec
    pub velocity: f64,
}

/// All drive sensors sampled once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveSnapshot {
    pub left: TreadReading,
    pub right: TreadReading,
    /// Heading in degrees (positive = clockwise)
    pub yaw: f64,
    /// Built-in accelerometer axes in g
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
}

impl DriveSnapshot {
    /// True if either accelerometer axis exceeds its threshold in magnitude
    pub fn bump_check(&self, bump_x: f64, bump_y: f64) -> bool {
        self.accel_x.abs() > bump_x || self.accel_y.abs() > bump_y
    }

    pub fn avg_distance(&self) -> f64 {
        (self.left.distance + self.right.distance) / 2.0
    }

    /// Zero when spinning in place or stopped, positive when moving forward
    pub fn avg_velocity(&self) -> f64 {
        (self.left.velocity + self.right.velocity) / 2.0
    }

    /// Large when moving or spinning quickly in any direction
    pub fn avg_abs_velocity(&self) -> f64 {
        (self.left.velocity.abs() + self.right.velocity.abs()) / 2.0
    }
}

/// Actuator and sensor side of the drive base
pub trait Drivetrain {
    /// Apply power to the left and right treads, [-1.0, +1.0], positive moves forward
    fn set_power(&mut self, power: TreadPower) -> Result<()>;

    /// Zero power on both sides
    fn stop(&mut self) -> Result<()> {
        self.set_power(TreadPower::zero())
    }

    /// Brake or coast when power is 0.0
    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<()>;

    /// Power currently applied to the treads
    fn applied_power(&self) -> TreadPower;

    /// Neutral behavior currently configured
    fn neutral_mode(&self) -> NeutralMode;

    /// Latest sensor values
    fn snapshot(&self) -> DriveSnapshot;

    /// Whether blended (arcade/tank/curvature) driving is available
    fn has_differential(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_check_either_axis() {
        let mut snap = DriveSnapshot::default();
        assert!(!snap.bump_check(0.4, 0.4));

        snap.accel_x = -0.5;
        assert!(snap.bump_check(0.4, 0.4));

        snap.accel_x = 0.0;
        snap.accel_y = 0.41;
        assert!(snap.bump_check(0.4, 0.4));

        // Threshold itself is not a bump
        snap.accel_y = 0.4;
        assert!(!snap.bump_check(0.4, 0.4));
    }

    #[test]
    fn test_average_helpers() {
        let snap = DriveSnapshot {
            left: TreadReading {
                distance: 2.0,
                counts: 100,
                velocity: 3.0,
            },
            right: TreadReading {
                distance: 4.0,
                counts: 200,
                velocity: -3.0,
            },
            ..Default::default()
        };
        assert_eq!(snap.avg_distance(), 3.0);
        assert_eq!(snap.avg_velocity(), 0.0);
        assert_eq!(snap.avg_abs_velocity(), 3.0);
    }

    #[test]
    fn test_neutral_mode_from_brake() {
        assert_eq!(NeutralMode::from_brake(true), NeutralMode::Brake);
        assert_eq!(NeutralMode::from_brake(false), NeutralMode::Coast);
    }
}
