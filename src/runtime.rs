// Fixed-rate control loop with watchdog
// Note: if the operator station stops sending input for longer than the command
// timeout, the robot is treated as disabled and the treads are stopped

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{
    CMD_TIMEOUT, LOOP_HZ, TOPIC_CMD_ACTION, TOPIC_CMD_DASHBOARD, TOPIC_CMD_OPERATOR, TOPIC_HEALTH,
    TOPIC_RT_DRIVE, TOPIC_STATE_SENSORS, TOPIC_TELEMETRY,
};
use crate::drive::{
    DriveSnapshot, Drivetrain, NeutralMode, RemoteDrivetrain, Result as DriveResult, SimConfig,
    SimDrivetrain, TreadPower,
};
use crate::messages::{
    DashboardAction, DashboardUpdate, DriveActuation, OperatorInput, RuntimeHealth,
};
use crate::robot::Robot;

/// Error types for the outer loop
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Loop settings chosen on the command line
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub sim: bool,
    pub loop_hz: u64,
    pub cmd_timeout: Duration,
    pub debug: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            sim: false,
            loop_hz: LOOP_HZ,
            cmd_timeout: CMD_TIMEOUT,
            debug: false,
        }
    }
}

/// The drive base the robot talks to
#[derive(Debug)]
pub enum BaseDrive {
    Sim(SimDrivetrain),
    Remote(RemoteDrivetrain),
}

impl Drivetrain for BaseDrive {
    fn set_power(&mut self, power: TreadPower) -> DriveResult<()> {
        match self {
            BaseDrive::Sim(d) => d.set_power(power),
            BaseDrive::Remote(d) => d.set_power(power),
        }
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> DriveResult<()> {
        match self {
            BaseDrive::Sim(d) => d.set_neutral_mode(mode),
            BaseDrive::Remote(d) => d.set_neutral_mode(mode),
        }
    }

    fn applied_power(&self) -> TreadPower {
        match self {
            BaseDrive::Sim(d) => d.applied_power(),
            BaseDrive::Remote(d) => d.applied_power(),
        }
    }

    fn neutral_mode(&self) -> NeutralMode {
        match self {
            BaseDrive::Sim(d) => d.neutral_mode(),
            BaseDrive::Remote(d) => d.neutral_mode(),
        }
    }

    fn snapshot(&self) -> DriveSnapshot {
        match self {
            BaseDrive::Sim(d) => d.snapshot(),
            BaseDrive::Remote(d) => d.snapshot(),
        }
    }

    fn has_differential(&self) -> bool {
        match self {
            BaseDrive::Sim(d) => d.has_differential(),
            BaseDrive::Remote(d) => d.has_differential(),
        }
    }
}

pub struct Runtime {
    robot: Robot<BaseDrive>,
    latest_input: Option<OperatorInput>,
    cmd_received_at: Instant,
    cmd_timeout: Duration,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(drive: BaseDrive, options: &RuntimeOptions) -> Self {
        Self {
            robot: Robot::new(drive, options.debug),
            latest_input: None,
            cmd_received_at: Instant::now(),
            cmd_timeout: options.cmd_timeout,
            health: RuntimeHealth::CmdStale, // Start stale until first input
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn robot(&self) -> &Robot<BaseDrive> {
        &self.robot
    }

    /// Process incoming operator input
    fn on_input(&mut self, input: OperatorInput) {
        debug!("Received operator input: {:?}", &input);
        self.latest_input = Some(input);
        self.cmd_received_at = Instant::now();
    }

    fn on_action(&mut self, action: DashboardAction) {
        self.robot.handle_action(action);
    }

    fn on_dashboard(&mut self, update: DashboardUpdate) {
        debug!("Dashboard update: {} = {:?}", update.key, update.value);
        self.robot.set_dashboard_value(&update.key, update.value);
    }

    fn on_sensors(&mut self, snapshot: DriveSnapshot) {
        if let BaseDrive::Remote(remote) = self.robot.drive_mut() {
            remote.update_snapshot(snapshot);
        }
    }

    /// Operator input to act on, after the watchdog check
    fn current_input(&mut self) -> OperatorInput {
        let cmd_age = self.cmd_received_at.elapsed();

        if cmd_age > self.cmd_timeout {
            // Watchdog triggered - disable the robot
            if self.health != RuntimeHealth::CmdStale {
                warn!("Operator input stale ({:?} old), disabling", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            OperatorInput::disabled()
        } else if let Some(ref input) = self.latest_input {
            if self.health != RuntimeHealth::Ok {
                info!("Operator input received, watchdog ok");
            }
            self.health = RuntimeHealth::Ok;
            input.clone()
        } else {
            // No input ever received
            self.health = RuntimeHealth::CmdStale;
            OperatorInput::disabled()
        }
    }

    /// Run one control tick and return the resulting actuation
    pub fn step(&mut self, dt: f64) -> DriveActuation {
        let started = Instant::now();
        let input = self.current_input();

        if let BaseDrive::Sim(sim) = self.robot.drive_mut() {
            sim.step(dt);
        }
        self.robot.tick(&input);
        self.robot.record_loop_time(started.elapsed().as_secs_f64());

        self.robot.actuation()
    }
}

/// Decode a JSON sample, logging (not propagating) malformed payloads
fn parse<T: serde::de::DeserializeOwned>(sample: &zenoh::sample::Sample, what: &str) -> Option<T> {
    let payload = sample.payload().to_bytes();
    match serde_json::from_slice::<T>(&payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to parse {}: {}", what, e);
            None
        }
    }
}

pub async fn run(options: RuntimeOptions) -> Result<()> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_operator = session.declare_subscriber(TOPIC_CMD_OPERATOR).await?;
    let sub_action = session.declare_subscriber(TOPIC_CMD_ACTION).await?;
    let sub_dashboard = session.declare_subscriber(TOPIC_CMD_DASHBOARD).await?;
    let sub_sensors = session.declare_subscriber(TOPIC_STATE_SENSORS).await?;
    let pub_actuation = session.declare_publisher(TOPIC_RT_DRIVE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_TELEMETRY).await?;

    let drive = if options.sim {
        info!("Using simulated drivetrain");
        BaseDrive::Sim(SimDrivetrain::new(SimConfig::default()))
    } else {
        BaseDrive::Remote(RemoteDrivetrain::new())
    };

    let loop_hz = options.loop_hz.max(1);
    let period = Duration::from_micros(1_000_000 / loop_hz);
    let dt = period.as_secs_f64();
    let mut runtime = Runtime::new(drive, &options);
    let mut tick = interval(period);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        loop_hz,
        options.cmd_timeout.as_millis()
    );
    info!(
        "Subscribed to: {}, {}, {}, {}",
        TOPIC_CMD_OPERATOR, TOPIC_CMD_ACTION, TOPIC_CMD_DASHBOARD, TOPIC_STATE_SENSORS
    );
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_RT_DRIVE, TOPIC_HEALTH, TOPIC_TELEMETRY
    );

    loop {
        tick.tick().await;

        // 1. Drain all pending messages (non-blocking), operator input keeps latest
        while let Ok(Some(sample)) = sub_operator.try_recv() {
            if let Some(input) = parse::<OperatorInput>(&sample, "operator input") {
                runtime.on_input(input);
            }
        }
        while let Ok(Some(sample)) = sub_action.try_recv() {
            if let Some(action) = parse::<DashboardAction>(&sample, "dashboard action") {
                runtime.on_action(action);
            }
        }
        while let Ok(Some(sample)) = sub_dashboard.try_recv() {
            if let Some(update) = parse::<DashboardUpdate>(&sample, "dashboard update") {
                runtime.on_dashboard(update);
            }
        }
        while let Ok(Some(sample)) = sub_sensors.try_recv() {
            if let Some(snapshot) = parse::<DriveSnapshot>(&sample, "sensor snapshot") {
                runtime.on_sensors(snapshot);
            }
        }

        // 2. Tick the robot (includes watchdog logic)
        let actuation = runtime.step(dt);

        // 3. Publish actuation
        let actuation_json = serde_json::to_string(&actuation)?;
        pub_actuation.put(actuation_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;

        // 5. Publish dashboard values that changed this tick
        let changed = runtime.robot.drain_telemetry();
        if !changed.is_empty() {
            let telemetry_json = serde_json::to_string(&changed)?;
            pub_telemetry.put(telemetry_json).await?;
        }
    }
}
