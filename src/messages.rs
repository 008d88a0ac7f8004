// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::dashboard::DashValue;
use crate::drive::{NeutralMode, TreadPower};

/// Game mode selected by the operator station
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotMode {
    #[default]
    Disabled,
    Teleop,
    Autonomous,
}

impl RobotMode {
    pub fn is_enabled(&self) -> bool {
        *self != RobotMode::Disabled
    }

    pub fn label(&self) -> &'static str {
        match self {
            RobotMode::Disabled => "Disabled",
            RobotMode::Teleop => "Teleop",
            RobotMode::Autonomous => "Auton",
        }
    }
}

// Operator station -> runtime, sent every cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorInput {
    #[serde(default)]
    pub mode: RobotMode,
    /// Raw gamepad axes indexed by axis id, each [-1.0, +1.0]
    #[serde(default)]
    pub axes: Vec<f64>,
    /// Gamepad buttons, bit (id - 1) set while button `id` is held
    #[serde(default)]
    pub buttons: u32,
}

impl OperatorInput {
    /// Input used when the operator station has gone quiet
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Raw axis value, 0.0 if the axis was not sent
    pub fn axis(&self, id: usize) -> f64 {
        self.axes
            .get(id)
            .copied()
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(-1.0, 1.0))
            .unwrap_or(0.0)
    }

    /// Button state, ids start at 1
    pub fn button(&self, id: u8) -> bool {
        (1..=32).contains(&id) && self.buttons & (1 << (id - 1)) != 0
    }

    pub fn with_axis(mut self, id: usize, value: f64) -> Self {
        if self.axes.len() <= id {
            self.axes.resize(id + 1, 0.0);
        }
        self.axes[id] = value;
        self
    }

    pub fn with_button(mut self, id: u8, pressed: bool) -> Self {
        if (1..=32).contains(&id) {
            let bit = 1u32 << (id - 1);
            if pressed {
                self.buttons |= bit;
            } else {
                self.buttons &= !bit;
            }
        }
        self
    }

    pub fn with_mode(mut self, mode: RobotMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Autonomous routines available from the chooser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonChoice {
    #[default]
    DoNothing,
    DriveForward,
    DriveBackward,
    RotateRight,
    RotateLeft,
}

impl AutonChoice {
    pub const ALL: [AutonChoice; 5] = [
        AutonChoice::DoNothing,
        AutonChoice::DriveForward,
        AutonChoice::DriveBackward,
        AutonChoice::RotateRight,
        AutonChoice::RotateLeft,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AutonChoice::DoNothing => "Do Nothing",
            AutonChoice::DriveForward => "Drive Forward",
            AutonChoice::DriveBackward => "Drive Backward",
            AutonChoice::RotateRight => "Rotate Right",
            AutonChoice::RotateLeft => "Rotate Left",
        }
    }

    /// Left/right power multipliers for the timed drive, None for no motion
    pub fn gains(&self) -> Option<(f64, f64)> {
        match self {
            AutonChoice::DoNothing => None,
            AutonChoice::DriveForward => Some((1.0, 1.0)),
            AutonChoice::DriveBackward => Some((-1.0, -1.0)),
            AutonChoice::RotateRight => Some((1.0, -1.0)),
            AutonChoice::RotateLeft => Some((-1.0, 1.0)),
        }
    }
}

// One-shot dashboard buttons -> runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "choice")]
pub enum DashboardAction {
    FlipFront,
    BrakeModeToggle,
    RestartMeasure,
    RunCalibration,
    ResetPerformance,
    SelectAuton(AutonChoice),
}

// Operator edit of a dashboard tunable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardUpdate {
    pub key: String,
    pub value: DashValue,
}

// Actuation output from runtime -> drive base
// Has default values because we don't always have an actuation to send
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct DriveActuation {
    pub left: f64,
    pub right: f64,
    pub neutral: NeutralMode,
}

impl DriveActuation {
    pub fn new(power: TreadPower, neutral: NeutralMode) -> Self {
        Self {
            left: power.left,
            right: power.right,
            neutral,
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_defaults_and_clamps() {
        let input = OperatorInput::default().with_axis(1, -2.0).with_axis(4, 0.3);
        assert_eq!(input.axis(1), -1.0);
        assert_eq!(input.axis(4), 0.3);
        assert_eq!(input.axis(9), 0.0);
        assert_eq!(input.axis(0), 0.0);
    }

    #[test]
    fn test_buttons_are_one_based() {
        let input = OperatorInput::default().with_button(5, true);
        assert!(input.button(5));
        assert!(!input.button(6));
        assert!(!input.button(0));
        assert_eq!(input.buttons, 0b1_0000);

        let input = input.with_button(5, false);
        assert!(!input.button(5));
    }

    #[test]
    fn test_operator_input_json() {
        let json = r#"{"mode":"teleop","axes":[0.0,-0.5],"buttons":32}"#;
        let input: OperatorInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.mode, RobotMode::Teleop);
        assert_eq!(input.axis(1), -0.5);
        assert!(input.button(6));

        // Everything is optional
        let input: OperatorInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.mode, RobotMode::Disabled);
    }

    #[test]
    fn test_dashboard_action_json() {
        let a: DashboardAction = serde_json::from_str(r#"{"action":"flip_front"}"#).unwrap();
        assert_eq!(a, DashboardAction::FlipFront);
        let a: DashboardAction =
            serde_json::from_str(r#"{"action":"select_auton","choice":"rotate_left"}"#).unwrap();
        assert_eq!(a, DashboardAction::SelectAuton(AutonChoice::RotateLeft));
    }

    #[test]
    fn test_dashboard_update_json() {
        let u: DashboardUpdate =
            serde_json::from_str(r#"{"key":"Drive Mode","value":2.0}"#).unwrap();
        assert_eq!(u.key, "Drive Mode");
        assert_eq!(u.value, DashValue::Number(2.0));
        let u: DashboardUpdate =
            serde_json::from_str(r#"{"key":"Quick Turn","value":true}"#).unwrap();
        assert_eq!(u.value, DashValue::Bool(true));
    }

    #[test]
    fn test_auton_gains() {
        assert_eq!(AutonChoice::DoNothing.gains(), None);
        assert_eq!(AutonChoice::RotateRight.gains(), Some((1.0, -1.0)));
        assert_eq!(AutonChoice::ALL.len(), 5);
    }
}
