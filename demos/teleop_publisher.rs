// Keyboard operator station: W/S throttle, A/D rotate, Shift slow, Q quit
// Modes: T teleop, G autonomous, Space disable
// Dashboard: F flip front, B brake mode, M restart measure, C calibrate,
// P reset timing, 1-5 pick the autonomous routine
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use treadbot_runtime::config::{
    AXIS_ROTATION, AXIS_THROTTLE, BUTTON_SLOW_MODE, TOPIC_CMD_ACTION, TOPIC_CMD_OPERATOR,
};
use treadbot_runtime::messages::{AutonChoice, DashboardAction, OperatorInput, RobotMode};

const STICK: f64 = 0.6; // Axis deflection while a key is held
const INPUT_TIMEOUT_MS: u64 = 100; // Release the sticks after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_operator = session.declare_publisher(TOPIC_CMD_OPERATOR).await?;
    let pub_action = session.declare_publisher(TOPIC_CMD_ACTION).await?;

    info!("Controls: W/S=throttle, A/D=rotate, Shift=slow, T/G/Space=mode, Q=quit");
    info!("Dashboard: F=flip, B=brake, M=measure, C=calibrate, P=reset timing, 1-5=auton");

    enable_raw_mode()?;
    let result = run_station(&pub_operator, &pub_action).await;
    disable_raw_mode()?;

    result
}

async fn run_station(
    pub_operator: &zenoh::pubsub::Publisher<'_>,
    pub_action: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut mode = RobotMode::Disabled;
    let mut throttle = 0.0;
    let mut rotation = 0.0;
    let mut slow = false;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) = event::read()?
            {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let mut action = None;

                if pressed {
                    match code {
                        KeyCode::Char(c) if "wsadWSAD".contains(c) => {
                            slow = modifiers.contains(KeyModifiers::SHIFT) || c.is_uppercase();
                            match c.to_ascii_lowercase() {
                                'w' => throttle = STICK,
                                's' => throttle = -STICK,
                                'a' => rotation = -STICK,
                                _ => rotation = STICK,
                            }
                            last_movement_input = Instant::now();
                        }

                        KeyCode::Char('t') => mode = set_mode(RobotMode::Teleop),
                        KeyCode::Char('g') => mode = set_mode(RobotMode::Autonomous),
                        KeyCode::Char(' ') => mode = set_mode(RobotMode::Disabled),

                        KeyCode::Char('f') => action = Some(DashboardAction::FlipFront),
                        KeyCode::Char('b') => action = Some(DashboardAction::BrakeModeToggle),
                        KeyCode::Char('m') => action = Some(DashboardAction::RestartMeasure),
                        KeyCode::Char('c') => action = Some(DashboardAction::RunCalibration),
                        KeyCode::Char('p') => action = Some(DashboardAction::ResetPerformance),
                        KeyCode::Char(c @ '1'..='5') => {
                            let idx = c as usize - '1' as usize;
                            let choice = AutonChoice::ALL[idx];
                            info!("Auton: {}", choice.label());
                            action = Some(DashboardAction::SelectAuton(choice));
                        }

                        // Quit
                        KeyCode::Char('q') | KeyCode::Esc => break,

                        _ => {}
                    }
                }

                if let Some(action) = action {
                    pub_action.put(serde_json::to_string(&action)?).await?;
                }
            }
        }

        // Release the sticks if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            throttle = 0.0;
            rotation = 0.0;
            slow = false;
        }

        // Always publish at ~50Hz, gamepad Y reads negative when pushed forward
        let input = OperatorInput::default()
            .with_mode(mode)
            .with_axis(AXIS_THROTTLE, -throttle)
            .with_axis(AXIS_ROTATION, rotation)
            .with_button(BUTTON_SLOW_MODE, slow);
        pub_operator.put(serde_json::to_string(&input)?).await?;
    }

    Ok(())
}

fn set_mode(mode: RobotMode) -> RobotMode {
    info!("Mode: {}", mode.label());
    mode
}
