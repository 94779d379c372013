use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use projsearch::cli::{Cli, Commands};
use projsearch::commands;
use projsearch::search::SearchError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PROJSEARCH_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let search_error = e.downcast_ref::<SearchError>();
            if !matches!(search_error, Some(SearchError::Cancelled)) {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(search_error.map_or(1, SearchError::exit_code))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Search(args)) => {
            let report = commands::search(&args)?;
            if report.no_results {
                eprintln!("No results");
            }
            print!("{}", report.output);
            Ok(())
        }
        Some(Commands::Engines) => {
            for info in commands::engines()? {
                let location = match &info.resolved {
                    Ok(path) => path.display().to_string(),
                    Err(e) => format!("not found ({e})"),
                };
                println!(
                    "{:<18} {:<40} {}",
                    info.id.as_str(),
                    info.supported_options().join(","),
                    location
                );
            }
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "projsearch=debug" } else { "projsearch=warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
