// Command layer for the drive base
//
// Provides:
// - The DriveCommand lifecycle (initialize, execute, is_finished, end/interrupted)
// - CommandSlot, which ticks one command and guarantees its cleanup step
// - Teleop dispatch, the timed ramp profile, measurement and CPU calibration

pub mod calibration;
pub mod measure;
pub mod ramp;
pub mod teleop;

pub use calibration::{CalibrationCommand, CalibrationLoop, CalibrationPhase, CpuWorkload, Workload};
pub use measure::{MeasureCommand, Measurement, MeasurementBaseline, MeasurementTracker};
pub use ramp::{RampPhase, RampProfileSequencer, TimedDriveCommand};
pub use teleop::{
    DriveIntent, DriveMode, DriveOutput, KinematicsDispatcher, SessionToggles, TeleopCommand,
    TeleopSettings,
};

use tracing::{debug, info, warn};

use crate::dashboard::Dashboard;
use crate::drive::{Drivetrain, TreadPower};
use crate::messages::OperatorInput;

/// Everything a command may touch during one tick
pub struct TickContext<'a> {
    pub drive: &'a mut dyn Drivetrain,
    pub dashboard: &'a mut dyn Dashboard,
    pub toggles: &'a SessionToggles,
    pub input: &'a OperatorInput,
}

impl TickContext<'_> {
    /// Apply power, logging (not propagating) actuator failures
    pub fn apply_power(&mut self, power: TreadPower) {
        if let Err(e) = self.drive.set_power(power) {
            warn!("Failed to apply drive power {:?}: {}", power, e);
            self.stop_drive();
        }
    }

    /// Stop both treads, logging failures
    pub fn stop_drive(&mut self) {
        if let Err(e) = self.drive.stop() {
            warn!("Failed to stop drive: {}", e);
        }
    }
}

/// A unit of behavior ticked by the scheduler
pub trait DriveCommand {
    fn name(&self) -> &str;

    /// Drive-owning commands are mutually exclusive and must stop the drive on exit
    fn requires_drive(&self) -> bool {
        true
    }

    /// Keep ticking while the robot is disabled
    fn runs_when_disabled(&self) -> bool {
        false
    }

    /// Called once when the command is started
    fn initialize(&mut self, ctx: &mut TickContext<'_>);

    /// Called every tick while running
    fn execute(&mut self, ctx: &mut TickContext<'_>);

    fn is_finished(&self) -> bool;

    /// Cleanup after normal completion
    fn end(&mut self, ctx: &mut TickContext<'_>);

    /// Cleanup after being cancelled or preempted
    fn interrupted(&mut self, ctx: &mut TickContext<'_>) {
        self.end(ctx);
    }
}

/// What happened to the slot's command during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Idle,
    Running,
    Finished,
}

/// Runs at most one command and makes sure its cleanup runs on every exit path
#[derive(Default)]
pub struct CommandSlot {
    active: Option<Box<dyn DriveCommand>>,
}

impl CommandSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Name of the running command
    pub fn current(&self) -> Option<&str> {
        self.active.as_deref().map(|c| c.name())
    }

    /// Start a command, interrupting whatever was running
    pub fn start(&mut self, mut command: Box<dyn DriveCommand>, ctx: &mut TickContext<'_>) {
        self.cancel(ctx);
        info!("Starting command: {}", command.name());
        command.initialize(ctx);
        self.active = Some(command);
    }

    /// Interrupt the running command, if any
    pub fn cancel(&mut self, ctx: &mut TickContext<'_>) -> bool {
        match self.active.take() {
            Some(mut command) => {
                info!("Interrupting command: {}", command.name());
                command.interrupted(ctx);
                true
            }
            None => false,
        }
    }

    /// Execute the running command once and retire it if done
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> SlotStatus {
        let Some(command) = self.active.as_mut() else {
            return SlotStatus::Idle;
        };

        command.execute(ctx);
        if !command.is_finished() {
            return SlotStatus::Running;
        }

        debug!("Command finished: {}", command.name());
        if let Some(mut command) = self.active.take() {
            command.end(ctx);
        }
        SlotStatus::Finished
    }

    /// Cancel the running command unless it may run while disabled
    pub fn cancel_if_disabled_only(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let keep = self
            .active
            .as_deref()
            .is_some_and(|c| c.runs_when_disabled());
        if keep { false } else { self.cancel(ctx) }
    }
}
