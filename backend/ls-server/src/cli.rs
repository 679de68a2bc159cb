use crate::{PairArgs, ServeArgs};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ls-server")]
#[command(about = "Local server host with device pairing")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the local server and keep it running until Ctrl+C
    Serve(ServeArgs),

    /// Render a pairing QR image for arbitrary text
    Pair(PairArgs),
}
