//! armflash CLI - Command-line tool for flashing LPC2000-family ARM
//! microcontrollers over their serial ISP boot ROM.
//!
//! ## Features
//!
//! - Flash many boards in parallel, one job per serial port
//! - Decode and dump Intel HEX32 firmware files
//! - List available serial ports (human-readable or JSON)

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::debug;
use std::env;
use std::path::PathBuf;

mod commands;

use commands::{cmd_dump, cmd_flash, cmd_list_ports};

/// armflash - flash LPC2000-family microcontrollers over serial ISP.
///
/// Flash jobs are given as groups of five tokens:
/// `<port> <firmware.hex> <baud> <crystal-khz> <device>`.
#[derive(Parser)]
#[command(name = "armflash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Flash one or more devices in parallel.
    Flash {
        /// Job tokens, five per device: port firmware baud crystal device.
        #[arg(required = true)]
        jobs: Vec<String>,
    },

    /// Decode a HEX32 firmware file and print every data record.
    Dump {
        /// Path to the firmware file.
        firmware: PathBuf,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if env::var("NO_COLOR").is_ok()
        || !console::Term::stderr()
            .is_term()
    {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "armflash v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    match &cli.command {
        Commands::Flash { jobs } => cmd_flash(jobs, cli.quiet),
        Commands::Dump { firmware } => cmd_dump(firmware),
        Commands::ListPorts { json } => cmd_list_ports(*json),
    }
}
