// Timed open-loop drive: ramp up, cruise, ramp down, stop
//
// Used by autonomous to check how consistently the base drives when
// controlled purely by tick counts.

use tracing::{debug, info};

use super::{DriveCommand, TickContext};
use crate::config::{keys, DEFAULT_CRUISE_TICKS, DEFAULT_FIXED_POWER, DEFAULT_RAMP_TICKS};
use crate::dashboard::Dashboard;
use crate::drive::TreadPower;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampPhase {
    RampUp,
    Cruise,
    RampDown,
    Done,
}

/// Tick-driven ramp profile state machine
#[derive(Debug, Clone)]
pub struct RampProfileSequencer {
    left_gain: f64,
    right_gain: f64,
    phase: RampPhase,
    /// Ticks spent in the current phase
    ticks: u32,
    ramp_ticks: u32,
    cruise_ticks: u32,
    target: TreadPower,
}

impl RampProfileSequencer {
    /// # Arguments
    /// * `left_gain` - Power multiplier/inverter for the left side (typically 1.0 or -1.0)
    /// * `right_gain` - Power multiplier/inverter for the right side (typically 1.0 or -1.0)
    pub fn new(left_gain: f64, right_gain: f64) -> Self {
        Self {
            left_gain,
            right_gain,
            phase: RampPhase::Done,
            ticks: 0,
            ramp_ticks: DEFAULT_RAMP_TICKS,
            cruise_ticks: DEFAULT_CRUISE_TICKS,
            target: TreadPower::zero(),
        }
    }

    /// Start a new run. Ramp length is at least one tick.
    pub fn activate(&mut self, left_power: f64, right_power: f64, ramp_ticks: u32, cruise_ticks: u32) {
        self.ramp_ticks = ramp_ticks.max(1);
        self.cruise_ticks = cruise_ticks;
        self.target = TreadPower::new(self.left_gain * left_power, self.right_gain * right_power);
        self.ticks = 0;
        self.phase = RampPhase::RampUp;
    }

    pub fn phase(&self) -> RampPhase {
        self.phase
    }

    pub fn target(&self) -> TreadPower {
        self.target
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RampPhase::Done
    }

    /// Leave the run early, output is zero from here on
    pub fn abort(&mut self) {
        self.phase = RampPhase::Done;
        self.ticks = 0;
    }

    fn check_phase_change(&mut self, next: RampPhase, at_ticks: u32) {
        if self.ticks >= at_ticks {
            debug!("Ramp phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
            self.ticks = 0;
        }
    }

    /// Advance one tick and return the power to apply
    pub fn step(&mut self) -> TreadPower {
        self.ticks += 1;
        let ramp = self.ramp_ticks as f64;

        match self.phase {
            RampPhase::RampUp => {
                let power = self.target.scaled(self.ticks as f64 / ramp);
                self.check_phase_change(RampPhase::Cruise, self.ramp_ticks);
                power
            }
            RampPhase::Cruise => {
                let power = self.target;
                self.check_phase_change(RampPhase::RampDown, self.cruise_ticks);
                power
            }
            RampPhase::RampDown => {
                let remaining = self.ramp_ticks.saturating_sub(self.ticks) as f64;
                let power = self.target.scaled(remaining / ramp);
                self.check_phase_change(RampPhase::Done, self.ramp_ticks);
                power
            }
            RampPhase::Done => TreadPower::zero(),
        }
    }
}

/// Autonomous command wrapping the ramp profile
#[derive(Debug, Clone)]
pub struct TimedDriveCommand {
    sequencer: RampProfileSequencer,
}

impl TimedDriveCommand {
    pub fn new(left_gain: f64, right_gain: f64) -> Self {
        Self {
            sequencer: RampProfileSequencer::new(left_gain, right_gain),
        }
    }

    /// Put the profile tunables on the dashboard
    pub fn seed(dashboard: &mut dyn Dashboard) {
        dashboard.initialize_number(keys::FIXED_LEFT, DEFAULT_FIXED_POWER);
        dashboard.initialize_number(keys::FIXED_RIGHT, DEFAULT_FIXED_POWER);
        dashboard.initialize_number(keys::RAMP_TICKS, DEFAULT_RAMP_TICKS as f64);
        dashboard.initialize_number(keys::CRUISE_TICKS, DEFAULT_CRUISE_TICKS as f64);
    }

    pub fn phase(&self) -> RampPhase {
        self.sequencer.phase()
    }
}

fn read_ticks(dashboard: &dyn Dashboard, key: &str, default: u32) -> u32 {
    let v = dashboard.get_number(key, default as f64);
    if v.is_finite() && v >= 0.0 {
        v as u32
    } else {
        default
    }
}

impl DriveCommand for TimedDriveCommand {
    fn name(&self) -> &str {
        "DriveTickTimed"
    }

    /// Configuration is read once here and not re-read mid-run
    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        let ramp_ticks = read_ticks(ctx.dashboard, keys::RAMP_TICKS, DEFAULT_RAMP_TICKS);
        let cruise_ticks = read_ticks(ctx.dashboard, keys::CRUISE_TICKS, DEFAULT_CRUISE_TICKS);
        let left = ctx.dashboard.get_number(keys::FIXED_LEFT, DEFAULT_FIXED_POWER);
        let right = ctx.dashboard.get_number(keys::FIXED_RIGHT, DEFAULT_FIXED_POWER);

        self.sequencer.activate(left, right, ramp_ticks, cruise_ticks);
        info!(
            "Timed drive: target {:?}, {} ramp ticks, {} cruise ticks",
            self.sequencer.target(),
            ramp_ticks,
            cruise_ticks
        );
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        let phase = self.sequencer.phase();
        let power = self.sequencer.step();
        if phase == RampPhase::Done {
            ctx.stop_drive();
            return;
        }
        ctx.apply_power(power);

        // Velocity should ramp up, hold steady while cruising, then reach zero
        let snap = ctx.drive.snapshot();
        let label = match phase {
            RampPhase::RampUp => "Ramp Up",
            RampPhase::Cruise => "Cruise",
            _ => "Ramp Down",
        };
        ctx.dashboard
            .put_number(&format!("{label} Velocity (left)"), snap.left.velocity);
        ctx.dashboard
            .put_number(&format!("{label} Velocity (right)"), snap.right.velocity);
    }

    fn is_finished(&self) -> bool {
        self.sequencer.is_finished()
    }

    fn end(&mut self, ctx: &mut TickContext<'_>) {
        ctx.stop_drive();
    }

    fn interrupted(&mut self, ctx: &mut TickContext<'_>) {
        self.sequencer.abort();
        self.end(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{CommandSlot, SessionToggles, SlotStatus};
    use crate::dashboard::MemoryDashboard;
    use crate::drive::{Drivetrain, SimDrivetrain};
    use crate::messages::OperatorInput;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_idle_until_activated() {
        let mut seq = RampProfileSequencer::new(1.0, 1.0);
        assert!(seq.is_finished());
        assert!(seq.step().is_zero());
    }

    #[test]
    fn test_profile_shape() {
        let mut seq = RampProfileSequencer::new(1.0, 1.0);
        seq.activate(0.4, 0.4, 20, 40);

        let mut outputs = Vec::new();
        let mut ticks = 0;
        while !seq.is_finished() {
            outputs.push(seq.step());
            ticks += 1;
            assert!(ticks <= 1000, "profile never finished");
        }

        assert_eq!(ticks, 80);
        // Tick 10 is halfway up the ramp
        assert!(close(outputs[9].left, 0.2));
        assert!(close(outputs[9].right, 0.2));
        // Tick 20 reaches full power and enters cruise
        assert!(close(outputs[19].left, 0.4));
        for p in &outputs[20..60] {
            assert!(close(p.left, 0.4) && close(p.right, 0.4));
        }
        // Ramp down ends at zero
        assert!(close(outputs[60].left, 0.38));
        assert!(close(outputs[79].left, 0.0));
    }

    #[test]
    fn test_phase_boundaries() {
        let mut seq = RampProfileSequencer::new(1.0, 1.0);
        seq.activate(0.4, 0.4, 20, 40);
        for _ in 0..19 {
            seq.step();
        }
        assert_eq!(seq.phase(), RampPhase::RampUp);
        seq.step();
        assert_eq!(seq.phase(), RampPhase::Cruise);
        for _ in 0..40 {
            seq.step();
        }
        assert_eq!(seq.phase(), RampPhase::RampDown);
        for _ in 0..19 {
            seq.step();
        }
        assert!(!seq.is_finished());
        seq.step();
        assert!(seq.is_finished());
    }

    #[test]
    fn test_gains_shape_targets() {
        let mut seq = RampProfileSequencer::new(1.0, -1.0);
        seq.activate(0.5, 0.3, 4, 2);
        assert_eq!(seq.target(), TreadPower::new(0.5, -0.3));
        let p = seq.step();
        assert!(close(p.left, 0.125));
        assert!(close(p.right, -0.075));
    }

    #[test]
    fn test_reactivation_resets() {
        let mut seq = RampProfileSequencer::new(1.0, 1.0);
        seq.activate(0.4, 0.4, 20, 40);
        for _ in 0..30 {
            seq.step();
        }
        seq.activate(0.2, 0.2, 10, 10);
        assert_eq!(seq.phase(), RampPhase::RampUp);
        assert!(close(seq.step().left, 0.02));
    }

    #[test]
    fn test_zero_ramp_ticks_does_not_divide_by_zero() {
        let mut seq = RampProfileSequencer::new(1.0, 1.0);
        seq.activate(0.4, 0.4, 0, 0);
        let p = seq.step();
        assert!(p.left.is_finite());
        assert!(close(p.left, 0.4));
    }

    #[test]
    fn test_command_reads_dashboard_once_and_stops_when_done() {
        let mut drive = SimDrivetrain::default();
        let mut dash = MemoryDashboard::new();
        TimedDriveCommand::seed(&mut dash);
        dash.put_number(keys::RAMP_TICKS, 2.0);
        dash.put_number(keys::CRUISE_TICKS, 3.0);
        let toggles = SessionToggles::default();
        let input = OperatorInput::default();
        let mut ctx = TickContext {
            drive: &mut drive,
            dashboard: &mut dash,
            toggles: &toggles,
            input: &input,
        };

        let mut slot = CommandSlot::new();
        slot.start(Box::new(TimedDriveCommand::new(1.0, 1.0)), &mut ctx);

        // Changing tunables mid-run has no effect
        ctx.dashboard.put_number(keys::FIXED_LEFT, 1.0);

        assert_eq!(slot.tick(&mut ctx), SlotStatus::Running);
        assert!(close(ctx.drive.applied_power().left, 0.2));

        let mut ticks = 1;
        while slot.tick(&mut ctx) == SlotStatus::Running {
            ticks += 1;
        }
        assert_eq!(ticks + 1, 7);
        assert!(ctx.drive.applied_power().is_zero());
        assert!(ctx.dashboard.get("Cruise Velocity (left)").is_some());
    }

    #[test]
    fn test_interrupt_mid_cruise_stops() {
        let mut drive = SimDrivetrain::default();
        let mut dash = MemoryDashboard::new();
        let toggles = SessionToggles::default();
        let input = OperatorInput::default();
        let mut ctx = TickContext {
            drive: &mut drive,
            dashboard: &mut dash,
            toggles: &toggles,
            input: &input,
        };

        let mut slot = CommandSlot::new();
        slot.start(Box::new(TimedDriveCommand::new(1.0, 1.0)), &mut ctx);
        for _ in 0..30 {
            slot.tick(&mut ctx);
        }
        assert!(!ctx.drive.applied_power().is_zero());

        slot.cancel(&mut ctx);
        assert!(ctx.drive.applied_power().is_zero());
        assert!(!slot.is_running());
    }
}
