mod app;
mod cli;
mod domain;
mod infra;
mod presentation;
mod utils;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::context::AppContext;
use cli::{Cli, Commands};

const LOG_ENV: &str = "TARSEND_LOG";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut ctx = AppContext::bootstrap(cli.profiles_file)?;

    match cli.command {
        Commands::Profile { command } => presentation::profiles::handle(&mut ctx, command),
        Commands::Send(args) => presentation::send::handle(&mut ctx, args),
    }
}

/// 日志输出到 stderr；TARSEND_LOG 优先于 -v
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
