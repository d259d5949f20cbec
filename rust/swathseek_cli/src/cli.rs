use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the run archive (will over-write the config file)
    #[arg(short, long)]
    pub run_archive: Option<PathBuf>,

    /// Path to the spectral library (will over-write the config file)
    #[arg(short, long)]
    pub library: Option<PathBuf>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of rayon worker threads, all cores when unset
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}
