//! Career Journey - Main Entry Point
//!
//! Runs one roadmap command against the local journey database.

use career_journey::cli::{self, Cli};
use clap::Parser;

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
