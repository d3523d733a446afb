use clap::{CommandFactory, Parser};
use tidywatch::cli::{self, Cli};
use tidywatch::output::OutputFormatter;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Neither mode selected: print usage and exit without error.
    if !cli.undo && cli.source.is_none() {
        let _ = Cli::command().print_help();
        println!();
        return;
    }

    if let Err(e) = cli::run(&cli) {
        tracing::error!(error = %e, "Unrecoverable error; shutting down");
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}
