// Differential-drive kinematics for the two-tread base
// Converts operator throttle/rotation (or per-side) inputs into left/right power.

use crate::config::DIFFERENTIAL_DEADBAND;

/// Throttle magnitude under which quick-turn feeds the quick-stop accumulator
pub const QUICK_STOP_THRESHOLD: f64 = 0.2;
/// Low-pass gain for the quick-stop accumulator
pub const QUICK_STOP_ALPHA: f64 = 0.1;

/// Left/right power commands, each in [-1.0, +1.0]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TreadPower {
    pub left: f64,
    pub right: f64,
}

impl TreadPower {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Both sides scaled by the same factor
    pub fn scaled(&self, gain: f64) -> Self {
        Self::new(self.left * gain, self.right * gain)
    }

    pub fn is_zero(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Clamp to [-1.0, +1.0]
pub fn limit(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

/// Zero values inside the deadband and rescale the rest so the output stays continuous
pub fn apply_deadband(value: f64, deadband: f64) -> f64 {
    if value.abs() > deadband {
        if value > 0.0 {
            (value - deadband) / (1.0 - deadband)
        } else {
            (value + deadband) / (1.0 - deadband)
        }
    } else {
        0.0
    }
}

/// Square the magnitude, keep the sign (finer control near zero)
pub fn square_preserving_sign(value: f64) -> f64 {
    (value * value).copysign(value)
}

/// Limit and deadband a raw operator input
fn condition(value: f64, deadband: f64) -> f64 {
    apply_deadband(limit(value), deadband)
}

/// Arcade drive: single throttle + rotation stick
///
/// # Arguments
/// * `throttle` - Forward power (positive = forward)
/// * `rotation` - Rotation rate (positive = clockwise)
/// * `square_inputs` - Square both inputs (sign preserving) before blending
pub fn arcade(throttle: f64, rotation: f64, square_inputs: bool) -> TreadPower {
    arcade_with_deadband(throttle, rotation, square_inputs, DIFFERENTIAL_DEADBAND)
}

pub fn arcade_with_deadband(
    throttle: f64,
    rotation: f64,
    square_inputs: bool,
    deadband: f64,
) -> TreadPower {
    let mut x = condition(throttle, deadband);
    let mut z = condition(rotation, deadband);

    if square_inputs {
        x = square_preserving_sign(x);
        z = square_preserving_sign(z);
    }

    let max_input = x.abs().max(z.abs()).copysign(x);

    let (left, right) = if x >= 0.0 {
        if z >= 0.0 {
            (max_input, x - z)
        } else {
            (x + z, max_input)
        }
    } else if z >= 0.0 {
        (x + z, max_input)
    } else {
        (max_input, x - z)
    };

    TreadPower::new(limit(left), limit(right))
}

/// Tank drive: independent left and right sticks
pub fn tank(left: f64, right: f64, square_inputs: bool) -> TreadPower {
    tank_with_deadband(left, right, square_inputs, DIFFERENTIAL_DEADBAND)
}

pub fn tank_with_deadband(left: f64, right: f64, square_inputs: bool, deadband: f64) -> TreadPower {
    let mut l = condition(left, deadband);
    let mut r = condition(right, deadband);

    if square_inputs {
        l = square_preserving_sign(l);
        r = square_preserving_sign(r);
    }

    TreadPower::new(l, r)
}

/// Curvature drive state
///
/// The rotation input sets path curvature instead of turn rate, so turning
/// scales with throttle. Quick-turn allows rotating in place. The quick-stop
/// accumulator carries over between calls and bleeds off residual rotation
/// after a quick-turn.
#[derive(Debug, Clone, Copy)]
pub struct CurvatureDrive {
    quick_stop_accumulator: f64,
    quick_stop_threshold: f64,
    quick_stop_alpha: f64,
    deadband: f64,
}

impl Default for CurvatureDrive {
    fn default() -> Self {
        Self {
            quick_stop_accumulator: 0.0,
            quick_stop_threshold: QUICK_STOP_THRESHOLD,
            quick_stop_alpha: QUICK_STOP_ALPHA,
            deadband: DIFFERENTIAL_DEADBAND,
        }
    }
}

impl CurvatureDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulator(&self) -> f64 {
        self.quick_stop_accumulator
    }

    pub fn reset(&mut self) {
        self.quick_stop_accumulator = 0.0;
    }

    pub fn drive(&mut self, throttle: f64, rotation: f64, quick_turn: bool) -> TreadPower {
        let x = condition(throttle, self.deadband);
        let z = condition(rotation, self.deadband);

        let over_power;
        let angular_power;

        if quick_turn {
            if x.abs() < self.quick_stop_threshold {
                self.quick_stop_accumulator = (1.0 - self.quick_stop_alpha)
                    * self.quick_stop_accumulator
                    + self.quick_stop_alpha * limit(z) * 2.0;
            }
            over_power = true;
            angular_power = z;
        } else {
            over_power = false;
            angular_power = x.abs() * z - self.quick_stop_accumulator;

            if self.quick_stop_accumulator > 1.0 {
                self.quick_stop_accumulator -= 1.0;
            } else if self.quick_stop_accumulator < -1.0 {
                self.quick_stop_accumulator += 1.0;
            } else {
                self.quick_stop_accumulator = 0.0;
            }
        }

        let mut left = x + angular_power;
        let mut right = x - angular_power;

        // Push whatever exceeds the limit onto the other side
        if over_power {
            if left > 1.0 {
                right -= left - 1.0;
                left = 1.0;
            } else if right > 1.0 {
                left -= right - 1.0;
                right = 1.0;
            } else if left < -1.0 {
                right -= left + 1.0;
                left = -1.0;
            } else if right < -1.0 {
                left -= right + 1.0;
                right = -1.0;
            }
        }

        let max_magnitude = left.abs().max(right.abs());
        if max_magnitude > 1.0 {
            left /= max_magnitude;
            right /= max_magnitude;
        }

        TreadPower::new(left, right)
    }
}
