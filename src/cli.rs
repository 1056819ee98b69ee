use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "subfetch")]
#[command(about = "Find and download subtitles for video files")]
pub struct Cli {
    /// Subtitle language code (e.g. fr, en)
    #[arg(short = 'l', long = "lang")]
    pub lang: Option<String>,

    /// Video file or directory to scan recursively
    #[arg(short = 'p', long = "path", default_value = ".")]
    pub path: PathBuf,

    /// Enable debug output
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Stop at the first file that fails instead of moving on
    #[arg(long)]
    pub fail_fast: bool,
}
