use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod demo;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scripted in-process session and print the transcript.
    Demo(DemoArgs),
    /// Decode one wire message and print its classification.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Demo(args) => demo::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Values the client asks the host counter to add, in order
    /// (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "2,3,4")]
    pub values: Vec<i64>,
    /// The host emits its milestone signal when the running total reaches
    /// this value.
    #[arg(long, default_value = "5")]
    pub milestone: i64,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// JSON message text, or '-' to read from stdin.
    pub message: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
