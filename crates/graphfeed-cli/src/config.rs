use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "graphfeed")]
#[command(about = "Pull ranked feed items into an outline")]
pub struct Config {
    /// Settings file (raw key/value JSON object)
    #[arg(long, env = "GRAPHFEED_SETTINGS", default_value = "./graphfeed.json")]
    pub settings_file: PathBuf,

    /// Run a single source instead of all configured sources
    #[arg(long)]
    pub source: Option<String>,

    /// Run through the automatic once-per-day gate instead of unconditionally
    #[arg(long, default_value = "false")]
    pub auto: bool,
}
