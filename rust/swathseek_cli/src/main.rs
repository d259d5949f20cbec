mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), errors::CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();
    let config = Config::with_cli_args(&args)?;

    if args.print_config {
        let text = serde_json::to_string_pretty(&config)
            .map_err(|e| errors::CliError::ParseError { msg: e.to_string() })?;
        println!("{}", text);
        return Ok(());
    }

    let config = config.resolve()?;
    info!("Parsed configuration: {:#?}", config);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| errors::CliError::Config {
                source: e.to_string(),
            })?;
    }

    std::fs::create_dir_all(&config.output.directory)
        .map_err(|e| errors::CliError::io(e, &config.output.directory))?;

    let report = processing::process_run(&config)?;
    info!(
        "{} of {} targets identified at {} FDR",
        report.summary.identified_targets, report.summary.total_targets, report.summary.fdr_cutoff
    );
    Ok(())
}
