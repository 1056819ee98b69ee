mod cli;
mod config;
mod domain;
mod infra;
mod logging;
mod media;
mod workflows;

#[cfg(test)]
mod testing;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{debug, warn};

use cli::Cli;
use infra::download::HttpTransfer;
use infra::languages::subtitle_language_id;
use infra::opensubtitles::OpenSubtitlesClient;
use workflows::resolver::Resolver;
use workflows::scan::{self, RunReport};

fn main() {
    let cli = Cli::parse();
    logging::init_logger(cli.debug);

    match run(cli) {
        Ok(report) if report.has_failures() => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<RunReport> {
    let settings = config::load_settings()?;
    debug!(endpoint = %settings.catalog.endpoint, "Loaded settings");

    if !cli.path.exists() {
        bail!("Input path does not exist: {:?}", cli.path);
    }

    let language = cli.lang.unwrap_or(settings.language);
    let language_id = subtitle_language_id(&language);
    if language_id.is_empty() {
        warn!(language = %language, "Unknown language code, searching subtitles in any language");
    }

    let transfer = HttpTransfer::new(settings.catalog.timeout_secs)?;
    let catalog = OpenSubtitlesClient::new(settings.catalog)?;
    let mut resolver = Resolver::new(catalog, transfer, language_id);

    let report = scan::scan(&cli.path, &mut resolver, cli.fail_fast)?;
    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &RunReport) {
    println!();
    println!(
        "Done: {} downloaded, {} not found, {} skipped, {} failed",
        report.downloaded,
        report.not_found,
        report.skipped,
        report.failures.len()
    );
    for (path, error) in &report.failures {
        println!("  {path:?}: {error}");
    }
}
