//! CLI entry point (spec.md §6): two subcommands, `capture` for flag-driven
//! invocation and `interactive` for a terminal-prompted one, mirroring
//! `original_source/src/GCCRecorder/user_interface.py`'s `flag_command` and
//! `interactive_prompt`.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread::sleep;

use clap::{Parser, Subcommand};
use gcc_capture::{run_capture, CaptureConfig, CaptureOutcome, Signals};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gcc-capture",
    about = "Captures USB traffic from a Gamecube controller adapter, and converts its data into a human readable format"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pass capture configuration through flags.
    Capture {
        /// Log verbosity level.
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
        /// USB bus number to watch.
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        bus: u16,
        /// Device number to extract data from.
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..))]
        device: u8,
        /// Adapter port number to watch.
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=4))]
        port: u8,
        /// Location of output file.
        #[arg(short, long)]
        output: String,
        /// Duration of packet capture, in seconds.
        #[arg(short = 'c', long = "capture-time", value_parser = clap::value_parser!(f64))]
        capture_time: f64,
        /// Wait time before starting capture, in seconds (default = 0).
        #[arg(short, long = "wait-time", default_value_t = 0.0)]
        wait_time: f64,
    },
    /// Enter capture configuration through an interactive prompt in the terminal.
    Interactive {
        /// Log verbosity level.
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Capture {
            verbose,
            bus,
            device,
            port,
            output,
            capture_time,
            wait_time,
        } => {
            init_logging(verbose);
            let config = CaptureConfig::new(bus, device, port, output, capture_time);
            run(config, wait_time)
        }
        Command::Interactive { verbose } => {
            init_logging(verbose);
            let (config, wait_time) = prompt_for_config()?;
            run(config, wait_time)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn run(config: CaptureConfig, wait_time: f64) -> anyhow::Result<()> {
    if !config.usbmon_path().exists() {
        println!(
            "usbmon pipe for bus number {} \"{}\" can't be found. Have you activated usbmon?",
            config.bus,
            config.usbmon_path().display()
        );
        std::process::exit(7);
    }

    if wait_time > 0.0 {
        println!("Starting soon...");
        sleep(std::time::Duration::from_secs_f64(wait_time));
    }

    println!("Starting capture.");

    let signals = Arc::new(Signals::new());
    let handler_signals = Arc::clone(&signals);
    ctrlc::set_handler(move || {
        handler_signals.set_abort();
    })
    .expect("installing Ctrl-C handler");

    match run_capture(&config, signals)? {
        CaptureOutcome::Success { rows_written } => {
            println!(
                "Capture file ready! See result in '{}'. ({rows_written} rows written)",
                config.output_path.display()
            );
        }
        CaptureOutcome::Aborted => {
            println!("Due to an error, the application was interrupted. Please try again.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Prompts for one value, re-asking until `parse` accepts it or the user
/// enters an empty line (which aborts, matching the teacher's `exit(n)`
/// one-shot-prompt behavior).
fn prompt<T, F>(label: &str, parse: F) -> anyhow::Result<T>
where
    F: Fn(&str) -> Result<T, &'static str>,
{
    loop {
        print!("{label} : ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        let line = line.trim();
        if line.is_empty() {
            anyhow::bail!("no input provided for '{label}'");
        }
        match parse(line) {
            Ok(value) => return Ok(value),
            Err(message) => println!("{message}"),
        }
    }
}

fn parse_positive_int(text: &str) -> Result<u32, &'static str> {
    match text.parse::<u32>() {
        Ok(0) => Err("A value of 0 isn't allowed"),
        Ok(n) => Ok(n),
        Err(_) => Err("Only numbers (0-9) accepted"),
    }
}

fn parse_port(text: &str) -> Result<u8, &'static str> {
    match text.parse::<u8>() {
        Ok(n) if (1..=4).contains(&n) => Ok(n),
        Ok(_) => Err("Value must be between 1 and 4"),
        Err(_) => Err("Only numbers (0-9) accepted"),
    }
}

fn parse_positive_float(text: &str, strict: bool) -> Result<f64, &'static str> {
    match text.parse::<f64>() {
        Ok(v) if v < 0.0 => Err("Should be a positive real number"),
        Ok(v) if v == 0.0 && strict => Err("A value of 0 isn't allowed"),
        Ok(v) => Ok(v),
        Err(_) => Err("Should be a positive real number"),
    }
}

fn prompt_for_config() -> anyhow::Result<(CaptureConfig, f64)> {
    let bus = prompt("Enter bus number", parse_positive_int)? as u16;
    let device = prompt("Enter device number", parse_positive_int)? as u8;
    let player_port = prompt("Enter player port number", parse_port)?;
    let output_file: String = prompt("Enter name of output file", |t| Ok(t.to_string()))?;
    let duration = prompt("Enter capture duration (seconds)", |t| {
        parse_positive_float(t, true)
    })?;
    let wait_time = prompt("Enter time until capture start (seconds)", |t| {
        parse_positive_float(t, false)
    })?;
    let config = CaptureConfig::new(bus, device, player_port, output_file, duration);
    Ok((config, wait_time))
}
