use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "elo-calibrate")]
#[command(about = "Calibrate an Elographics touch screen through the driver's shared memory")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Rewrite the #ELOGRAPHICS_* lines of the X server configuration
    #[arg(short, long)]
    pub update_config: bool,

    /// X server configuration file to rewrite
    #[arg(short = 'f', long, value_name = "PATH")]
    pub xorg_config: Option<PathBuf>,

    /// Print diagnostic output
    #[arg(short, long)]
    pub verbose: bool,

    /// Screen width in pixels
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,

    /// Screen height in pixels
    #[arg(long, value_name = "PX")]
    pub height: Option<u32>,

    /// Distance of the calibration targets from the screen edges
    #[arg(long, value_name = "PX")]
    pub inset: Option<u32>,

    /// Shared memory object published by the driver
    #[arg(long, value_name = "NAME")]
    pub segment: Option<String>,

    /// Refuse a segment whose version field differs from this value
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub expect_version: Option<i32>,

    /// Leave the shared memory object in place on exit
    #[arg(long)]
    pub keep_segment: bool,

    /// Path to config file
    #[arg(long, env = "ELOCAL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the calibration record currently in shared memory
    Show,
    /// Print raw touch positions as the driver reports them
    Dump {
        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,
    },
}
