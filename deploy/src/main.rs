mod artifacts;
mod command_line;
mod config;
mod contracts;
mod deploy;
mod registry;
mod utils;
mod wallet;

use std::{io::Write, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use command_line::CommandLine;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init();

    let cmd = CommandLine::parse();
    let result = cmd.execute().await;
    ExitCode::from(exit_status(result, &mut std::io::stderr().lock()))
}

/// Prints the failure, if any, and maps the outcome to the process exit status.
fn exit_status<W: Write>(result: Result<()>, err: &mut W) -> u8 {
    match result {
        Ok(()) => 0,
        Err(error) => {
            log::error!("{:#}", error);
            let _ = writeln!(err, "Error: {:?}", error);
            1
        }
    }
}
