use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use engine_logging::LogDestination;
use log::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
    Off,
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "crawl_console",
    version,
    about = "Terminal controller for a remote web-crawling service"
)]
pub struct Cli {
    /// Website to crawl. Without it the console starts interactively.
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Base URL of the crawl service.
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Directory downloaded archives are saved to.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Status polling period used when the real-time feed is unavailable.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Never connect the real-time feed this run; always poll.
    #[arg(long, default_value_t = false, overrides_with = "feed")]
    pub no_feed: bool,

    /// Use the real-time feed even if the settings file disables it.
    #[arg(long, default_value_t = false, overrides_with = "no_feed")]
    pub feed: bool,

    /// Show the page preview once the crawl completes.
    #[arg(long, default_value_t = false)]
    pub preview: bool,

    /// Download the archive once the crawl completes.
    #[arg(long, default_value_t = false)]
    pub download: bool,

    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    #[arg(long, value_name = "FILE", default_value = engine_logging::DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// RON file holding saved settings and download history.
    #[arg(long, value_name = "FILE", default_value = ".crawl_console.ron")]
    pub settings: PathBuf,
}

impl Cli {
    pub fn log_destination(&self) -> Option<LogDestination> {
        match self.log {
            LogTarget::File => Some(LogDestination::File(self.log_file.clone())),
            LogTarget::Terminal => Some(LogDestination::Terminal),
            LogTarget::Both => Some(LogDestination::Both(self.log_file.clone())),
            LogTarget::Off => None,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
