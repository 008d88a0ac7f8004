// Loop timing, topics, dashboard keys and default tunables
use std::time::Duration;

// Runtime loop frequency (20 ms control cycle)
pub const LOOP_HZ: u64 = 50;

// Operator input timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_OPERATOR: &str = "treadbot/cmd/operator"; // gamepad + game mode
pub const TOPIC_CMD_ACTION: &str = "treadbot/cmd/action"; // one-shot dashboard buttons
pub const TOPIC_CMD_DASHBOARD: &str = "treadbot/cmd/dashboard"; // tunable writes
pub const TOPIC_STATE_SENSORS: &str = "treadbot/state/sensors"; // drive base sensor snapshots
pub const TOPIC_RT_DRIVE: &str = "treadbot/rt/drive"; // actuation
pub const TOPIC_HEALTH: &str = "treadbot/state/health"; // health status
pub const TOPIC_TELEMETRY: &str = "treadbot/state/telemetry"; // changed dashboard values

// Operator interface mapping (gamepad raw ids)
pub const AXIS_THROTTLE: usize = 1;
pub const AXIS_ROTATION: usize = 4;
pub const AXIS_LEFT: usize = 1;
pub const AXIS_RIGHT: usize = 3;
pub const BUTTON_FLIP_FRONT: u8 = 5;
pub const BUTTON_SLOW_MODE: u8 = 6;

/// Dashboard keys shared by the drive commands
pub mod keys {
    // Teleop tunables
    pub const DRIVE_MODE: &str = "Drive Mode";
    pub const QUICK_TURN: &str = "Quick Turn";
    pub const SQUARE_INPUTS: &str = "Square Inputs";
    pub const FIXED_LEFT: &str = "Fixed Left";
    pub const FIXED_RIGHT: &str = "Fixed Right";
    pub const ROTATION_GAIN: &str = "Rotation Gain";
    pub const SLOW_GAIN: &str = "Slow Gain";
    pub const MIN_DEFLECT: &str = "Min Deflect";

    // Session toggles
    pub const FLIPPED_FRONT: &str = "Flipped Front";
    pub const BRAKE_MODE: &str = "Brake Mode";

    // Timed auton
    pub const RAMP_TICKS: &str = "Ramp Ticks";
    pub const CRUISE_TICKS: &str = "Cruise Ticks";
    pub const AUTON_MODE: &str = "Auto mode";

    // Measurement
    pub const YAW_RAW: &str = "Yaw NavX";
    pub const YAW_MEASURED: &str = "Yaw Measured";
    pub const LEFT_DIST: &str = "Left Dist";
    pub const LEFT_CNTS: &str = "Left Cnts";
    pub const LEFT_VEL: &str = "Left Vel";
    pub const RIGHT_DIST: &str = "Right Dist";
    pub const RIGHT_CNTS: &str = "Right Cnts";
    pub const RIGHT_VEL: &str = "Right Vel";
    pub const ACCEL_X: &str = "Accel X";
    pub const ACCEL_Y: &str = "Accel Y";
    pub const BUMP: &str = "Bump";

    // Calibration
    pub const CPU_LOOPS: &str = "CPU Test Loops";
    pub const CPU_SECS: &str = "CPU Test Secs";
    pub const CPU_HZ: &str = "CPU Test Hz";

    // Performance
    pub const RUN_LAST: &str = "Run Last";
    pub const RUN_AVG: &str = "Run Avg";
    pub const RUN_MAX: &str = "Run Max";

    pub const GAME_MODE: &str = "Game Mode";
}

// Teleop defaults
pub const DEFAULT_FIXED_POWER: f64 = 0.4;
pub const DEFAULT_ROTATION_GAIN: f64 = 0.5;
pub const DEFAULT_SLOW_GAIN: f64 = 0.5;
pub const DEFAULT_MIN_DEFLECT: f64 = 1.0 / 64.0;
pub const DEFAULT_SQUARE_INPUTS: bool = true;
pub const DEFAULT_QUICK_TURN: bool = false;

// Deadband applied by the arcade/tank/curvature blends
pub const DIFFERENTIAL_DEADBAND: f64 = 0.025;

// Timed auton defaults (ticks at LOOP_HZ)
pub const DEFAULT_RAMP_TICKS: u32 = 20;
pub const DEFAULT_CRUISE_TICKS: u32 = 40;

// Bump detection thresholds (g)
pub const BUMP_THRESHOLD_X: f64 = 0.4;
pub const BUMP_THRESHOLD_Y: f64 = 0.4;

// Calibration
pub const CALIBRATION_TARGET_SECS: f64 = 0.1;
pub const CALIBRATION_MAX_ATTEMPTS: u32 = 24;
