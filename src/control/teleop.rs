// Operator drive: maps gamepad axes, drive mode and session toggles to tread power

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{DriveCommand, TickContext};
use crate::config::{
    keys, AXIS_LEFT, AXIS_RIGHT, AXIS_ROTATION, AXIS_THROTTLE, BUTTON_SLOW_MODE,
    DEFAULT_FIXED_POWER, DEFAULT_MIN_DEFLECT, DEFAULT_QUICK_TURN, DEFAULT_ROTATION_GAIN,
    DEFAULT_SLOW_GAIN, DEFAULT_SQUARE_INPUTS,
};
use crate::dashboard::Dashboard;
use crate::drive::kinematics::{arcade, tank};
use crate::drive::{CurvatureDrive, Drivetrain, NeutralMode, TreadPower};
use crate::messages::OperatorInput;

/// Input-to-power mappings selectable from the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Arcade = 0,
    Tank = 1,
    Curvature = 2,
    /// Open-loop fixed power, needs no blended actuator
    Fixed = 3,
}

impl DriveMode {
    /// Decode the dashboard selector, None if it names no known mode
    pub fn from_selector(selector: f64) -> Option<Self> {
        if selector.fract() != 0.0 {
            return None;
        }
        match selector as i64 {
            0 => Some(DriveMode::Arcade),
            1 => Some(DriveMode::Tank),
            2 => Some(DriveMode::Curvature),
            3 => Some(DriveMode::Fixed),
            _ => None,
        }
    }

    pub fn selector(&self) -> f64 {
        *self as i64 as f64
    }
}

/// Front/back and brake settings that persist for the whole control session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionToggles {
    pub is_flipped: bool,
    pub brake_mode: bool,
}

impl SessionToggles {
    /// Swap which end of the robot is the front
    pub fn flip_front(&mut self, dashboard: &mut dyn Dashboard) -> bool {
        self.is_flipped = !self.is_flipped;
        info!("Flipped front: {}", self.is_flipped);
        dashboard.put_bool(keys::FLIPPED_FRONT, self.is_flipped);
        self.is_flipped
    }

    /// Switch between brake and coast and push it to the motor controllers
    pub fn toggle_brake_mode(
        &mut self,
        dashboard: &mut dyn Dashboard,
        drive: &mut dyn Drivetrain,
    ) -> bool {
        self.brake_mode = !self.brake_mode;
        info!("Brake mode: {}", self.brake_mode);
        dashboard.put_bool(keys::BRAKE_MODE, self.brake_mode);
        if let Err(e) = drive.set_neutral_mode(self.neutral_mode()) {
            warn!("Failed to apply neutral mode: {}", e);
        }
        self.brake_mode
    }

    pub fn neutral_mode(&self) -> NeutralMode {
        NeutralMode::from_brake(self.brake_mode)
    }

    pub fn publish(&self, dashboard: &mut dyn Dashboard) {
        dashboard.put_bool(keys::FLIPPED_FRONT, self.is_flipped);
        dashboard.put_bool(keys::BRAKE_MODE, self.brake_mode);
    }
}

/// Dashboard tunables read when teleop starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleopSettings {
    pub mode: Option<DriveMode>,
    pub quick_turn: bool,
    pub square_inputs: bool,
    pub fixed_left: f64,
    pub fixed_right: f64,
    pub rotation_gain: f64,
    pub slow_gain: f64,
    pub min_deflect: f64,
}

impl Default for TeleopSettings {
    fn default() -> Self {
        Self {
            mode: Some(DriveMode::Arcade),
            quick_turn: DEFAULT_QUICK_TURN,
            square_inputs: DEFAULT_SQUARE_INPUTS,
            fixed_left: DEFAULT_FIXED_POWER,
            fixed_right: DEFAULT_FIXED_POWER,
            rotation_gain: DEFAULT_ROTATION_GAIN,
            slow_gain: DEFAULT_SLOW_GAIN,
            min_deflect: DEFAULT_MIN_DEFLECT,
        }
    }
}

impl TeleopSettings {
    /// Put the defaults on the dashboard without overwriting operator edits
    pub fn seed(dashboard: &mut dyn Dashboard) {
        let d = Self::default();
        dashboard.initialize_number(keys::DRIVE_MODE, DriveMode::Arcade.selector());
        dashboard.initialize_bool(keys::QUICK_TURN, d.quick_turn);
        dashboard.initialize_bool(keys::SQUARE_INPUTS, d.square_inputs);
        dashboard.initialize_number(keys::FIXED_LEFT, d.fixed_left);
        dashboard.initialize_number(keys::FIXED_RIGHT, d.fixed_right);
        dashboard.initialize_number(keys::ROTATION_GAIN, d.rotation_gain);
        dashboard.initialize_number(keys::SLOW_GAIN, d.slow_gain);
        dashboard.initialize_number(keys::MIN_DEFLECT, d.min_deflect);
    }

    pub fn load(dashboard: &dyn Dashboard) -> Self {
        let d = Self::default();
        Self {
            mode: DriveMode::from_selector(
                dashboard.get_number(keys::DRIVE_MODE, DriveMode::Arcade.selector()),
            ),
            quick_turn: dashboard.get_bool(keys::QUICK_TURN, d.quick_turn),
            square_inputs: dashboard.get_bool(keys::SQUARE_INPUTS, d.square_inputs),
            fixed_left: dashboard.get_number(keys::FIXED_LEFT, d.fixed_left),
            fixed_right: dashboard.get_number(keys::FIXED_RIGHT, d.fixed_right),
            rotation_gain: dashboard.get_number(keys::ROTATION_GAIN, d.rotation_gain),
            slow_gain: dashboard.get_number(keys::SLOW_GAIN, d.slow_gain),
            min_deflect: dashboard.get_number(keys::MIN_DEFLECT, d.min_deflect),
        }
    }
}

/// Operator intent for one tick, positive throttle drives forward
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveIntent {
    pub throttle: f64,
    pub rotation: f64,
    pub left: f64,
    pub right: f64,
    pub mode: Option<DriveMode>,
    pub quick_turn: bool,
    pub square_inputs: bool,
    pub slow_mode: bool,
}

impl DriveIntent {
    /// Gamepad Y axes read negative when pushed forward, so they are inverted here
    pub fn from_operator(input: &OperatorInput, settings: &TeleopSettings) -> Self {
        Self {
            throttle: -input.axis(AXIS_THROTTLE),
            rotation: input.axis(AXIS_ROTATION),
            left: -input.axis(AXIS_LEFT),
            right: -input.axis(AXIS_RIGHT),
            mode: settings.mode,
            quick_turn: settings.quick_turn,
            square_inputs: settings.square_inputs,
            slow_mode: input.button(BUTTON_SLOW_MODE),
        }
    }
}

/// Result of dispatching one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveOutput {
    Power(TreadPower),
    /// Unknown mode, stop the drive
    Stop,
}

/// Per-tick mapping from intent to tread power
#[derive(Debug, Clone, Default)]
pub struct KinematicsDispatcher {
    curvature: CurvatureDrive,
}

impl KinematicsDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear state carried between ticks (curvature quick-stop)
    pub fn reset(&mut self) {
        self.curvature.reset();
    }

    /// Map intent to power. Without a blended actuator only Fixed mode can run.
    pub fn dispatch(
        &mut self,
        intent: &DriveIntent,
        toggles: &SessionToggles,
        settings: &TeleopSettings,
        differential: bool,
    ) -> DriveOutput {
        let mut gain = 1.0;
        let mut rot_gain = settings.rotation_gain;

        // Slow-mo while the operator holds the slow button
        if intent.slow_mode {
            gain = settings.slow_gain;
            rot_gain = settings.slow_gain;
        }

        let mode = if differential {
            intent.mode
        } else {
            Some(DriveMode::Fixed)
        };

        match mode {
            Some(DriveMode::Arcade) => {
                let mut throttle = intent.throttle * gain;
                let rotation = intent.rotation * rot_gain;
                if toggles.is_flipped {
                    throttle = -throttle;
                }
                DriveOutput::Power(arcade(throttle, rotation, intent.square_inputs))
            }
            Some(DriveMode::Tank) => {
                let mut left = intent.left * gain;
                let mut right = intent.right * gain;
                if toggles.is_flipped {
                    let flipped_left = -left;
                    left = -right;
                    right = flipped_left;
                }
                DriveOutput::Power(tank(left, right, intent.square_inputs))
            }
            Some(DriveMode::Curvature) => {
                let mut throttle = intent.throttle * gain;
                let rotation = intent.rotation * rot_gain;
                if toggles.is_flipped {
                    throttle = -throttle;
                }
                DriveOutput::Power(self.curvature.drive(throttle, rotation, intent.quick_turn))
            }
            Some(DriveMode::Fixed) => {
                DriveOutput::Power(drive_fixed(intent, toggles, settings, gain, rot_gain))
            }
            None => DriveOutput::Stop,
        }
    }
}

/// Fixed dashboard power forward/back, or rotate in place, or nothing
fn drive_fixed(
    intent: &DriveIntent,
    toggles: &SessionToggles,
    settings: &TeleopSettings,
    gain: f64,
    rot_gain: f64,
) -> TreadPower {
    let mut throttle = intent.throttle;
    let rotation = intent.rotation;
    if toggles.is_flipped {
        throttle = -throttle;
    }

    let (fl, fr) = (settings.fixed_left, settings.fixed_right);
    let md = settings.min_deflect;

    if throttle > md {
        TreadPower::new(fl, fr).scaled(gain)
    } else if throttle < -md {
        TreadPower::new(-fl, -fr).scaled(gain)
    } else if rotation > md {
        TreadPower::new(fl, -fr).scaled(rot_gain)
    } else if rotation < -md {
        TreadPower::new(-fl, fr).scaled(rot_gain)
    } else {
        TreadPower::zero()
    }
}

/// Default drive command: operator control until preempted
#[derive(Debug, Default)]
pub struct TeleopCommand {
    dispatcher: KinematicsDispatcher,
    settings: TeleopSettings,
    differential: bool,
}

impl TeleopCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriveCommand for TeleopCommand {
    fn name(&self) -> &str {
        "HumanDrive"
    }

    /// Read in and apply current drive choices
    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        if let Err(e) = ctx.drive.set_neutral_mode(ctx.toggles.neutral_mode()) {
            warn!("Failed to apply neutral mode: {}", e);
        }
        self.settings = TeleopSettings::load(ctx.dashboard);
        self.differential = ctx.drive.has_differential();
        self.dispatcher.reset();

        match self.settings.mode {
            Some(_) if !self.differential => {
                info!("No differential drive available, forcing Fixed mode")
            }
            Some(mode) => info!("Teleop drive mode: {:?}", mode),
            None => warn!("Unknown drive mode selected, drive will stay stopped"),
        }
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        let intent = DriveIntent::from_operator(ctx.input, &self.settings);
        match self
            .dispatcher
            .dispatch(&intent, ctx.toggles, &self.settings, self.differential)
        {
            DriveOutput::Power(power) => ctx.apply_power(power),
            DriveOutput::Stop => ctx.stop_drive(),
        }
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn end(&mut self, ctx: &mut TickContext<'_>) {
        ctx.stop_drive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::MemoryDashboard;
    use crate::drive::{SimConfig, SimDrivetrain};
    use crate::messages::RobotMode;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn intent(mode: DriveMode, throttle: f64, rotation: f64) -> DriveIntent {
        DriveIntent {
            throttle,
            rotation,
            left: 0.0,
            right: 0.0,
            mode: Some(mode),
            quick_turn: false,
            square_inputs: false,
            slow_mode: false,
        }
    }

    fn power(out: DriveOutput) -> TreadPower {
        match out {
            DriveOutput::Power(p) => p,
            DriveOutput::Stop => panic!("expected power, got stop"),
        }
    }

    #[test]
    fn test_selector_decoding() {
        assert_eq!(DriveMode::from_selector(0.0), Some(DriveMode::Arcade));
        assert_eq!(DriveMode::from_selector(3.0), Some(DriveMode::Fixed));
        assert_eq!(DriveMode::from_selector(4.0), None);
        assert_eq!(DriveMode::from_selector(-1.0), None);
        assert_eq!(DriveMode::from_selector(1.5), None);
        assert_eq!(DriveMode::Curvature.selector(), 2.0);
    }

    #[test]
    fn test_fixed_forward() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let toggles = SessionToggles::default();

        let p = power(d.dispatch(&intent(DriveMode::Fixed, 0.5, 0.0), &toggles, &settings, true));
        assert!(close(p.left, 0.4));
        assert!(close(p.right, 0.4));
    }

    #[test]
    fn test_fixed_forward_flipped() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let toggles = SessionToggles {
            is_flipped: true,
            brake_mode: false,
        };

        let p = power(d.dispatch(&intent(DriveMode::Fixed, 0.5, 0.0), &toggles, &settings, true));
        assert!(close(p.left, -0.4));
        assert!(close(p.right, -0.4));
    }

    #[test]
    fn test_fixed_rotation_uses_rotation_gain() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let toggles = SessionToggles::default();

        let p = power(d.dispatch(&intent(DriveMode::Fixed, 0.0, 0.8), &toggles, &settings, true));
        assert!(close(p.left, 0.2));
        assert!(close(p.right, -0.2));

        let p = power(d.dispatch(&intent(DriveMode::Fixed, 0.0, -0.8), &toggles, &settings, true));
        assert!(close(p.left, -0.2));
        assert!(close(p.right, 0.2));
    }

    #[test]
    fn test_fixed_deadband_is_zero() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let toggles = SessionToggles::default();

        // 1/64 = 0.015625, at or under it reads as no input
        let p = power(d.dispatch(
            &intent(DriveMode::Fixed, 0.015, -0.015625),
            &toggles,
            &settings,
            true,
        ));
        assert!(p.is_zero());
    }

    #[test]
    fn test_slow_mode_overrides_both_gains() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings {
            slow_gain: 0.25,
            ..Default::default()
        };
        let toggles = SessionToggles::default();
        let mut i = intent(DriveMode::Fixed, 0.9, 0.0);
        i.slow_mode = true;

        let p = power(d.dispatch(&i, &toggles, &settings, true));
        assert!(close(p.left, 0.1));
        assert!(close(p.right, 0.1));

        // Arcade rotation also uses slow gain instead of rotation gain
        let mut i = intent(DriveMode::Arcade, 0.0, 1.0);
        i.slow_mode = true;
        let p = power(d.dispatch(&i, &toggles, &settings, true));
        assert!(p.left > 0.0 && p.left < 0.3);
    }

    #[test]
    fn test_arcade_flip_inverts_throttle_only() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let normal = SessionToggles::default();
        let flipped = SessionToggles {
            is_flipped: true,
            brake_mode: false,
        };

        let a = power(d.dispatch(&intent(DriveMode::Arcade, 0.6, 0.0), &normal, &settings, true));
        let b = power(d.dispatch(&intent(DriveMode::Arcade, 0.6, 0.0), &flipped, &settings, true));
        assert!(a.left > 0.0);
        assert!(close(a.left, -b.left));
        assert!(close(a.right, -b.right));

        // Pure rotation is unaffected by the flip
        let a = power(d.dispatch(&intent(DriveMode::Arcade, 0.0, 1.0), &normal, &settings, true));
        let b = power(d.dispatch(&intent(DriveMode::Arcade, 0.0, 1.0), &flipped, &settings, true));
        assert_eq!(a, b);
    }

    #[test]
    fn test_tank_flip_swaps_and_negates() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let flipped = SessionToggles {
            is_flipped: true,
            brake_mode: false,
        };
        let mut i = intent(DriveMode::Tank, 0.0, 0.0);
        i.left = 1.0;
        i.right = 0.5;

        let normal = power(d.dispatch(&i, &SessionToggles::default(), &settings, true));
        let p = power(d.dispatch(&i, &flipped, &settings, true));
        assert!(close(p.left, -normal.right));
        assert!(close(p.right, -normal.left));
    }

    #[test]
    fn test_curvature_flip_inverts_throttle() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let flipped = SessionToggles {
            is_flipped: true,
            brake_mode: false,
        };
        let p = power(d.dispatch(&intent(DriveMode::Curvature, 0.5, 0.0), &flipped, &settings, true));
        assert!(p.left < 0.0 && p.right < 0.0);
    }

    #[test]
    fn test_unknown_mode_stops() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let mut i = intent(DriveMode::Arcade, 1.0, 0.0);
        i.mode = None;
        assert_eq!(
            d.dispatch(&i, &SessionToggles::default(), &settings, true),
            DriveOutput::Stop
        );
    }

    #[test]
    fn test_no_differential_forces_fixed() {
        let mut d = KinematicsDispatcher::new();
        let settings = TeleopSettings::default();
        let mut i = intent(DriveMode::Arcade, 0.5, 0.0);
        let p = power(d.dispatch(&i, &SessionToggles::default(), &settings, false));
        assert!(close(p.left, 0.4) && close(p.right, 0.4));

        // Even an unknown selection falls back to Fixed
        i.mode = None;
        let p = power(d.dispatch(&i, &SessionToggles::default(), &settings, false));
        assert!(close(p.left, 0.4));
    }

    #[test]
    fn test_flip_front_twice_restores() {
        let mut dash = MemoryDashboard::new();
        let mut toggles = SessionToggles::default();
        assert!(toggles.flip_front(&mut dash));
        assert!(dash.get_bool(keys::FLIPPED_FRONT, false));
        assert!(!toggles.flip_front(&mut dash));
        assert_eq!(toggles, SessionToggles::default());
    }

    #[test]
    fn test_brake_toggle_twice_restores_and_propagates() {
        let mut dash = MemoryDashboard::new();
        let mut drive = SimDrivetrain::default();
        let mut toggles = SessionToggles::default();

        assert!(toggles.toggle_brake_mode(&mut dash, &mut drive));
        assert_eq!(drive.neutral_mode(), NeutralMode::Brake);
        assert!(dash.get_bool(keys::BRAKE_MODE, false));

        assert!(!toggles.toggle_brake_mode(&mut dash, &mut drive));
        assert_eq!(drive.neutral_mode(), NeutralMode::Coast);
        assert_eq!(toggles, SessionToggles::default());
    }

    #[test]
    fn test_intent_from_gamepad() {
        let input = OperatorInput::default()
            .with_mode(RobotMode::Teleop)
            .with_axis(AXIS_THROTTLE, -0.5)
            .with_axis(AXIS_ROTATION, 0.25)
            .with_axis(AXIS_RIGHT, 0.75)
            .with_button(BUTTON_SLOW_MODE, true);
        let i = DriveIntent::from_operator(&input, &TeleopSettings::default());
        assert_eq!(i.throttle, 0.5);
        assert_eq!(i.rotation, 0.25);
        assert_eq!(i.left, 0.5);
        assert_eq!(i.right, -0.75);
        assert!(i.slow_mode);
        assert_eq!(i.mode, Some(DriveMode::Arcade));
    }

    #[test]
    fn test_teleop_command_drives_from_dashboard_settings() {
        let mut drive = SimDrivetrain::new(SimConfig {
            differential: false,
            ..Default::default()
        });
        let mut dash = MemoryDashboard::new();
        TeleopSettings::seed(&mut dash);
        dash.put_number(keys::FIXED_LEFT, 0.3);
        let toggles = SessionToggles {
            is_flipped: false,
            brake_mode: true,
        };
        let input = OperatorInput::default().with_axis(AXIS_THROTTLE, -1.0);
        let mut ctx = TickContext {
            drive: &mut drive,
            dashboard: &mut dash,
            toggles: &toggles,
            input: &input,
        };

        let mut cmd = TeleopCommand::new();
        cmd.initialize(&mut ctx);
        assert_eq!(ctx.drive.neutral_mode(), NeutralMode::Brake);

        cmd.execute(&mut ctx);
        let p = ctx.drive.applied_power();
        assert!(close(p.left, 0.3));
        assert!(close(p.right, 0.4));
        assert!(!cmd.is_finished());

        cmd.interrupted(&mut ctx);
        assert!(ctx.drive.applied_power().is_zero());
    }
}
