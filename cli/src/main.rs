//! A basic command-line simulator.
//!
//! Loads a raw binary image into the RAM, presses the front-panel
//! start button (an interrupt which jams a restart instruction onto
//! the bus), and runs the processor until the program halts, an alarm
//! fires, or the optional state limit runs out.  On exit the
//! front-panel register display is printed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use base::prelude::Address;

mod console;
mod machine;
mod memory;
mod panel;
mod sleep;

use console::Console;
use machine::{Machine, RunOutcome};
use memory::Memory;
use panel::print_front_panel;

#[derive(Debug, Parser)]
#[command(about = "Simulate a historic 8-bit microprocessor system")]
struct Args {
    /// Raw binary program image loaded into RAM before start.
    image: Option<PathBuf>,

    /// Where the image is loaded (decimal, or hex with an 0x prefix).
    #[arg(long, default_value = "0", value_parser = parse_address)]
    load_address: Address,

    /// Which restart vector the front panel jams at power-on; the
    /// program starts at eight times this value.
    #[arg(long, default_value_t = 0)]
    restart_vector: u8,

    /// Run this many times slower than maximum ('MAX' for
    /// as-fast-as-possible, 1.0 for the original 500 kHz part).
    #[arg(long, default_value = "1.0")]
    speed_multiplier: String,

    /// Stop after simulating this many timing states.
    #[arg(long)]
    max_states: Option<u64>,
}

fn parse_address(text: &str) -> Result<Address, String> {
    let value = match text.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    }
    .map_err(|e| format!("{text} is not an address: {e}"))?;
    Ok(Address::from(value))
}

fn parse_speed_multiplier(text: &str) -> Result<Option<f64>, String> {
    if text == "MAX" {
        event!(
            Level::INFO,
            "--speed-multiplier=MAX, running at maximum speed"
        );
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(x) if x > 0.0 => Ok(Some(x)),
        Ok(x) => Err(format!("speed multiplier {x} is not positive")),
        Err(e) => Err(format!("{text} is not a speed multiplier: {e}")),
    }
}

fn run_simulator(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let speed_multiplier = parse_speed_multiplier(&args.speed_multiplier)?;
    if args.restart_vector > 7 {
        return Err(format!(
            "restart vector {} is out of range (0..=7)",
            args.restart_vector
        )
        .into());
    }

    let mut memory = Memory::new();
    if let Some(image) = &args.image {
        memory.load_image(image, args.load_address)?;
    } else {
        event!(
            Level::WARN,
            "no program image given; memory is full of halt instructions"
        );
    }

    let mut machine = Machine::new(memory, Console::new(), args.restart_vector);
    let result = machine.run(args.max_states, speed_multiplier);
    print_front_panel(&machine.status());
    match result {
        Ok(RunOutcome::Halted) => Ok(ExitCode::SUCCESS),
        Ok(RunOutcome::StepLimit) => {
            event!(Level::INFO, "state limit reached");
            Ok(ExitCode::SUCCESS)
        }
        Err(alarm) => {
            event!(Level::ERROR, "execution stopped: {alarm}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    // See the tracing-subscriber documentation for how to select
    // which trace messages get printed; the default is "info".
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            eprintln!("failed to set up the trace filter: {e}");
            return ExitCode::FAILURE;
        }
        Ok(layer) => layer,
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let args = Args::parse();
    match run_simulator(&args) {
        Ok(code) => code,
        Err(e) => {
            event!(Level::ERROR, "{e}");
            ExitCode::FAILURE
        }
    }
}
