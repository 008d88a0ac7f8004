// Simulated tank drivetrain
//
// First-order motor model per side: velocity chases power * max speed with a
// time constant that depends on neutral mode when power is zero. Encoders and
// the gyro are integrated from the side velocities.

use std::f64::consts::PI;
use tracing::debug;

use super::{DriveError, DriveSnapshot, Drivetrain, NeutralMode, Result, TreadPower, TreadReading};

/// Standard gravity in ft/s^2 (accelerometer reports g)
const GRAVITY_FT: f64 = 32.174;

/// Encoder counts per wheel revolution
pub const ENC_COUNTS_PER_REV: f64 = 256.0;
/// Wheel diameter in inches
pub const WHEEL_DIAMETER_IN: f64 = 6.0;
/// Feet travelled per encoder count
pub const FEET_PER_COUNT: f64 = (WHEEL_DIAMETER_IN / 12.0) * (PI / ENC_COUNTS_PER_REV);

/// Drivetrain model parameters
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Free speed at full power (ft/s)
    pub max_speed: f64,
    /// Response time constant while powered (s)
    pub drive_tau: f64,
    /// Decay time constant at zero power in brake mode (s)
    pub brake_tau: f64,
    /// Decay time constant at zero power in coast mode (s)
    pub coast_tau: f64,
    /// Distance between left and right treads (ft)
    pub wheelbase: f64,
    /// Whether blended driving is available
    pub differential: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_speed: 12.0,
            drive_tau: 0.15,
            brake_tau: 0.05,
            coast_tau: 0.6,
            wheelbase: 28.0 / 12.0,
            differential: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SimTread {
    power: f64,
    velocity: f64,
    distance: f64,
}

impl SimTread {
    fn step(&mut self, cfg: &SimConfig, neutral: NeutralMode, dt: f64) {
        let target = self.power * cfg.max_speed;
        let tau = if self.power == 0.0 {
            match neutral {
                NeutralMode::Brake => cfg.brake_tau,
                NeutralMode::Coast => cfg.coast_tau,
            }
        } else {
            cfg.drive_tau
        };
        let alpha = (dt / tau).min(1.0);
        self.velocity += (target - self.velocity) * alpha;
        self.distance += self.velocity * dt;
    }

    fn reading(&self) -> TreadReading {
        TreadReading {
            distance: self.distance,
            counts: (self.distance / FEET_PER_COUNT).round() as i64,
            velocity: self.velocity,
        }
    }
}

/// In-process stand-in for the real drive base
#[derive(Debug, Clone)]
pub struct SimDrivetrain {
    config: SimConfig,
    left: SimTread,
    right: SimTread,
    neutral: NeutralMode,
    yaw: f64,
    accel_x: f64,
    accel_y: f64,
    fault: Option<String>,
}

impl Default for SimDrivetrain {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimDrivetrain {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            left: SimTread::default(),
            right: SimTread::default(),
            neutral: NeutralMode::Coast,
            yaw: 0.0,
            accel_x: 0.0,
            accel_y: 0.0,
            fault: None,
        }
    }

    /// Advance the model by `dt` seconds
    pub fn step(&mut self, dt: f64) {
        let v_before = (self.left.velocity + self.right.velocity) / 2.0;

        self.left.step(&self.config, self.neutral, dt);
        self.right.step(&self.config, self.neutral, dt);

        let v_after = (self.left.velocity + self.right.velocity) / 2.0;
        let omega = (self.left.velocity - self.right.velocity) / self.config.wheelbase; // rad/s, clockwise

        self.yaw += omega * dt * (180.0 / PI);
        if dt > 0.0 {
            self.accel_y = (v_after - v_before) / dt / GRAVITY_FT;
        }
        self.accel_x = v_after * omega / GRAVITY_FT;
    }

    /// Make every following actuator call fail (None clears the fault)
    pub fn set_fault(&mut self, fault: Option<&str>) {
        self.fault = fault.map(str::to_string);
    }

    fn check_fault(&self) -> Result<()> {
        match &self.fault {
            Some(reason) => Err(DriveError::Fault(reason.clone())),
            None => Ok(()),
        }
    }
}

fn checked_power(side: &'static str, power: f64) -> Result<f64> {
    if !power.is_finite() {
        return Err(DriveError::InvalidPower { side, power });
    }
    Ok(power.clamp(-1.0, 1.0))
}

impl Drivetrain for SimDrivetrain {
    fn set_power(&mut self, power: TreadPower) -> Result<()> {
        self.check_fault()?;
        let left = checked_power("left", power.left)?;
        let right = checked_power("right", power.right)?;
        self.left.power = left;
        self.right.power = right;
        Ok(())
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<()> {
        self.check_fault()?;
        if mode != self.neutral {
            debug!("Sim drivetrain neutral mode -> {:?}", mode);
        }
        self.neutral = mode;
        Ok(())
    }

    fn applied_power(&self) -> TreadPower {
        TreadPower::new(self.left.power, self.right.power)
    }

    fn neutral_mode(&self) -> NeutralMode {
        self.neutral
    }

    fn snapshot(&self) -> DriveSnapshot {
        DriveSnapshot {
            left: self.left.reading(),
            right: self.right.reading(),
            yaw: self.yaw,
            accel_x: self.accel_x,
            accel_y: self.accel_y,
            accel_z: 1.0,
        }
    }

    fn has_differential(&self) -> bool {
        self.config.differential
    }
}
