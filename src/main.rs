use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hexapod_link::config;
use hexapod_link::programme::Programme;
use hexapod_link::servo::{CommandOutcome, ServoController};
use hexapod_link::transport::Transport;

#[derive(Parser)]
#[command(name = "hexapod-link", about = "Serial command-line control for a hexapod servo controller")]
struct Cli {
    /// Serial port, e.g. /dev/ttyUSB0 or COM3
    #[arg(long)]
    port: Option<String>,

    /// Line rate; must be one the controller firmware accepts
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enable one servo and command its initial angle
    Start {
        #[arg(long)]
        leg: u8,
        #[arg(long)]
        joint: u8,
        #[arg(long)]
        angle: String,
    },
    /// Disable one servo
    Stop {
        #[arg(long)]
        leg: u8,
        #[arg(long)]
        joint: u8,
    },
    /// Command a new angle for an already-started servo
    Set {
        #[arg(long)]
        leg: u8,
        #[arg(long)]
        joint: u8,
        #[arg(long)]
        angle: String,
    },
    /// Enable all three joints of a leg, hip to tip
    LegStart {
        #[arg(long)]
        leg: u8,
        #[arg(long, num_args = 3)]
        angles: Vec<String>,
    },
    /// Command new angles for a fully started leg
    LegSet {
        #[arg(long)]
        leg: u8,
        #[arg(long, num_args = 3)]
        angles: Vec<String>,
    },
    /// Disable all three joints of a leg
    LegStop {
        #[arg(long)]
        leg: u8,
    },
    /// Run a terminal-mode programme file, one command per line
    Run { file: PathBuf },
    /// List the baud rates the controller firmware accepts
    Baudrates,
}

fn main() -> ExitCode {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<u8, Box<dyn std::error::Error>> {
    if let Command::Baudrates = cli.command {
        for rate in config::AVAILABLE_BAUD_RATES {
            println!("{rate}");
        }
        return Ok(0);
    }

    let port = cli
        .port
        .as_deref()
        .ok_or("--port is required for this command")?;
    if !config::AVAILABLE_BAUD_RATES.contains(&cli.baud) {
        return Err(format!(
            "unsupported baud rate {} (supported: {:?})",
            cli.baud,
            config::AVAILABLE_BAUD_RATES
        )
        .into());
    }

    let mut transport = Transport::new();
    transport.connect(port, cli.baud)?;
    let mut controller = ServoController::new(transport);

    let code = match &cli.command {
        Command::Start { leg, joint, angle } => {
            outcome_code(controller.start_servo(*leg, *joint, angle)?)
        }
        Command::Stop { leg, joint } => outcome_code(controller.stop_servo(*leg, *joint)?),
        Command::Set { leg, joint, angle } => {
            let outcome = controller.set_angle(*leg, *joint, angle)?;
            if outcome == CommandOutcome::ServoInactive {
                eprintln!("servo is not started; use `start` first");
            }
            outcome_code(outcome)
        }
        Command::LegStart { leg, angles } => {
            outcome_code(controller.start_leg(*leg, leg_angles(angles)?)?)
        }
        Command::LegSet { leg, angles } => {
            let outcome = controller.set_leg(*leg, leg_angles(angles)?)?;
            if outcome == CommandOutcome::ServoInactive {
                eprintln!("leg has joints that are not started; use `leg-start` first");
            }
            outcome_code(outcome)
        }
        Command::LegStop { leg } => outcome_code(controller.stop_leg(*leg)?),
        Command::Run { file } => {
            let text = std::fs::read_to_string(file)?;
            let programme = Programme::from_lines(&text);
            info!("running programme of {} steps", programme.commands().len());
            let outcome = programme.run(controller.transport_mut())?;
            if cli.json {
                println!("{}", serde_json::to_string(&outcome)?);
            }
            outcome.exit_code()
        }
        Command::Baudrates => unreachable!("handled before connecting"),
    };

    if cli.json && !matches!(cli.command, Command::Run { .. }) {
        println!("{}", serde_json::to_string(&controller.report())?);
    }

    controller.transport_mut().disconnect()?;
    Ok(code)
}

fn outcome_code(outcome: CommandOutcome) -> u8 {
    match outcome {
        CommandOutcome::Sent => 0,
        CommandOutcome::NotConnected | CommandOutcome::ServoInactive => 1,
    }
}

fn leg_angles(angles: &[String]) -> Result<[&str; 3], Box<dyn std::error::Error>> {
    let [a, b, c] = angles else {
        return Err("expected exactly three angles".into());
    };
    Ok([a.as_str(), b.as_str(), c.as_str()])
}
