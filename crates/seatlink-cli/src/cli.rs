use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "seatlink", about = "Seat kiosk connectivity session over a serial AT module")]
pub struct Cli {
    /// Session configuration file (TOML). Built-in defaults when omitted.
    #[arg(long, short, env = "SEATLINK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the session against a serial port
    Run(RunOpts),
    /// Load and validate the configuration, then exit
    Validate,
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
}

#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Control loop period in milliseconds
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,
    /// Fee per completed minute of use
    #[arg(long, default_value_t = 1)]
    pub price_per_min: u32,
    /// Card UID (hex) to submit once the session is running
    #[arg(long, value_parser = parse_uid)]
    pub card: Option<CardUid>,
}

/// Card UID bytes as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUid(pub Vec<u8>);

/// Parse a card UID written as hex, e.g. `04A1B2C3`.
pub fn parse_uid(text: &str) -> anyhow::Result<CardUid> {
    if text.is_empty() || text.len() % 2 != 0 {
        bail!("card UID must be an even number of hex digits, got {text:?}");
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            let pair = text
                .get(i..i + 2)
                .ok_or_else(|| anyhow!("card UID must be ASCII hex"))?;
            u8::from_str_radix(pair, 16).map_err(|e| anyhow!("bad hex {pair:?}: {e}"))
        })
        .collect::<anyhow::Result<_>>()
        .map(CardUid)
}
