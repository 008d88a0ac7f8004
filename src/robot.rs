// Control session for the drive base
//
// Owns the drivetrain, the dashboard store and the session toggles, and runs
// the command slots once per scheduler tick:
// - drive slot: teleop (default) or the timed autonomous routine
// - measure slot: distance/rotation measurement, started at boot
// - calibration slot: CPU load calibration, started from the dashboard

use tracing::{info, warn};

use crate::config::{keys, BUTTON_FLIP_FRONT};
use crate::control::{
    CalibrationCommand, CommandSlot, MeasureCommand, SessionToggles, TeleopCommand, TeleopSettings,
    TickContext, TimedDriveCommand,
};
use crate::dashboard::{DashValue, Dashboard, MemoryDashboard};
use crate::drive::Drivetrain;
use crate::messages::{AutonChoice, DashboardAction, DriveActuation, OperatorInput, RobotMode};
use crate::performance::PerformanceMonitor;

#[derive(Default)]
struct Slots {
    drive: CommandSlot,
    measure: CommandSlot,
    calibration: CommandSlot,
}

impl Slots {
    fn tick_all(&mut self, ctx: &mut TickContext<'_>) {
        self.drive.tick(ctx);
        self.measure.tick(ctx);
        self.calibration.tick(ctx);
    }
}

pub struct Robot<D: Drivetrain> {
    drive: D,
    dashboard: MemoryDashboard,
    toggles: SessionToggles,
    mode: RobotMode,
    slots: Slots,
    auton: AutonChoice,
    performance: Option<PerformanceMonitor>,
    last_input: OperatorInput,
    flip_was_pressed: bool,
}

impl<D: Drivetrain> Robot<D> {
    /// Seed the dashboard and start measuring. `debug` enables tick timing.
    pub fn new(drive: D, debug: bool) -> Self {
        let mut robot = Self {
            drive,
            dashboard: MemoryDashboard::new(),
            toggles: SessionToggles::default(),
            mode: RobotMode::Disabled,
            slots: Slots::default(),
            auton: AutonChoice::default(),
            performance: debug.then(PerformanceMonitor::new),
            last_input: OperatorInput::disabled(),
            flip_was_pressed: false,
        };

        TeleopSettings::seed(&mut robot.dashboard);
        TimedDriveCommand::seed(&mut robot.dashboard);
        robot.toggles.publish(&mut robot.dashboard);
        robot
            .dashboard
            .put_text(keys::AUTON_MODE, robot.auton.label());
        robot
            .dashboard
            .put_text(keys::GAME_MODE, robot.mode.label());

        if let Err(e) = robot.drive.set_neutral_mode(robot.toggles.neutral_mode()) {
            warn!("Failed to apply neutral mode: {}", e);
        }
        robot.with_context(|slots, ctx| slots.measure.start(Box::new(MeasureCommand::new()), ctx));

        info!("Robot initialized (differential: {})", robot.drive.has_differential());
        robot
    }

    fn with_context<R>(&mut self, f: impl FnOnce(&mut Slots, &mut TickContext<'_>) -> R) -> R {
        let mut ctx = TickContext {
            drive: &mut self.drive,
            dashboard: &mut self.dashboard,
            toggles: &self.toggles,
            input: &self.last_input,
        };
        f(&mut self.slots, &mut ctx)
    }

    /// One scheduler tick
    pub fn tick(&mut self, input: &OperatorInput) {
        self.last_input = input.clone();

        if input.mode != self.mode {
            self.set_mode(input.mode);
        }

        let flip_pressed = self.mode.is_enabled() && input.button(BUTTON_FLIP_FRONT);
        if flip_pressed && !self.flip_was_pressed {
            self.toggles.flip_front(&mut self.dashboard);
        }
        self.flip_was_pressed = flip_pressed;

        let enabled = self.mode.is_enabled();
        self.with_context(|slots, ctx| {
            if enabled && !slots.drive.is_running() {
                slots.drive.start(Box::new(TeleopCommand::new()), ctx);
            }
            slots.tick_all(ctx);
        });
    }

    fn set_mode(&mut self, mode: RobotMode) {
        info!("Mode {} -> {}", self.mode.label(), mode.label());
        self.mode = mode;
        self.dashboard.put_text(keys::GAME_MODE, mode.label());

        let auton = self.auton;
        self.with_context(|slots, ctx| match mode {
            RobotMode::Disabled => {
                slots.drive.cancel_if_disabled_only(ctx);
                ctx.stop_drive();
            }
            RobotMode::Autonomous => {
                slots.drive.cancel(ctx);
                match auton.gains() {
                    Some((left, right)) => {
                        slots.drive.start(Box::new(TimedDriveCommand::new(left, right)), ctx)
                    }
                    None => info!("Autonomous: {}", auton.label()),
                }
            }
            RobotMode::Teleop => {
                if slots.drive.current() != Some("HumanDrive") {
                    slots.drive.cancel(ctx);
                }
            }
        });
    }

    /// Dashboard buttons, applied immediately
    pub fn handle_action(&mut self, action: DashboardAction) {
        info!("Dashboard action: {:?}", action);
        match action {
            DashboardAction::FlipFront => {
                self.toggles.flip_front(&mut self.dashboard);
            }
            DashboardAction::BrakeModeToggle => {
                self.toggles
                    .toggle_brake_mode(&mut self.dashboard, &mut self.drive);
            }
            DashboardAction::RestartMeasure => self.with_context(|slots, ctx| {
                slots.measure.start(Box::new(MeasureCommand::new()), ctx)
            }),
            DashboardAction::RunCalibration => self.with_context(|slots, ctx| {
                slots
                    .calibration
                    .start(Box::new(CalibrationCommand::new()), ctx)
            }),
            DashboardAction::ResetPerformance => {
                if let Some(perf) = self.performance.as_mut() {
                    perf.reset();
                    perf.publish(&mut self.dashboard);
                }
            }
            DashboardAction::SelectAuton(choice) => {
                self.auton = choice;
                self.dashboard.put_text(keys::AUTON_MODE, choice.label());
            }
        }
    }

    /// Operator edit of a tunable
    pub fn set_dashboard_value(&mut self, key: &str, value: DashValue) {
        self.dashboard.put(key, value);
    }

    /// Wall time of the last tick, only kept when debugging
    pub fn record_loop_time(&mut self, secs: f64) {
        if let Some(perf) = self.performance.as_mut() {
            perf.add_measurement(secs);
            perf.publish(&mut self.dashboard);
        }
    }

    /// What the drivetrain is currently told to do
    pub fn actuation(&self) -> DriveActuation {
        DriveActuation::new(self.drive.applied_power(), self.drive.neutral_mode())
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }

    pub fn dashboard(&self) -> &MemoryDashboard {
        &self.dashboard
    }

    pub fn drain_telemetry(&mut self) -> std::collections::BTreeMap<String, DashValue> {
        self.dashboard.drain_changed()
    }

    pub fn toggles(&self) -> SessionToggles {
        self.toggles
    }

    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    pub fn auton(&self) -> AutonChoice {
        self.auton
    }

    /// Name of the command that owns the drive
    pub fn drive_command(&self) -> Option<&str> {
        self.slots.drive.current()
    }

    pub fn is_measuring(&self) -> bool {
        self.slots.measure.is_running()
    }

    pub fn is_calibrating(&self) -> bool {
        self.slots.calibration.is_running()
    }
}

impl<D: Drivetrain> Drop for Robot<D> {
    fn drop(&mut self) {
        // Safety: stop the treads on shutdown
        info!("Shutting down robot, stopping drive");
        self.with_context(|slots, ctx| {
            slots.drive.cancel(ctx);
            ctx.stop_drive();
        });
    }
}
