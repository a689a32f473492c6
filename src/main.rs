mod app;
mod backup;
mod cli;
mod collection;
mod config;
mod error;
mod logging;
mod record;
mod session;
mod store;
mod ui;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
