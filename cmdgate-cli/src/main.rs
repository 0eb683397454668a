mod cli;
mod commands;
mod host;
mod transport;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run(Cli::parse()).await
}
