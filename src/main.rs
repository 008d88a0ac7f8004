use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use treadbot_runtime::config::{CMD_TIMEOUT, LOOP_HZ};
use treadbot_runtime::runtime::{self, RuntimeOptions};

#[derive(Parser, Debug)]
#[command(name = "treadbot-runtime")]
#[command(version)]
#[command(about = "Drive control runtime for a two-tread robot")]
struct Args {
    /// Drive a simulated base instead of the real one
    #[arg(long)]
    sim: bool,

    /// Control loop rate
    #[arg(long, default_value_t = LOOP_HZ)]
    loop_hz: u64,

    /// Operator input watchdog timeout
    #[arg(long, default_value_t = CMD_TIMEOUT.as_millis() as u64)]
    cmd_timeout_ms: u64,

    /// Publish per-tick timing (Run Last/Avg/Max)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let options = RuntimeOptions {
        sim: args.sim,
        loop_hz: args.loop_hz,
        cmd_timeout: Duration::from_millis(args.cmd_timeout_ms),
        debug: args.debug,
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
