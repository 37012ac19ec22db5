//! Command-line interface definitions for Archive Harvest.
//!
//! Every option overrides the matching key of the optional YAML config file;
//! options left unset keep the file's value or the built-in default.

use crate::config::{ConfigError, HarvestConfig, PacingConfig};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Archive Harvest application.
///
/// # Examples
///
/// ```sh
/// # Collect a topic archive with chromedriver running on the default port
/// archive_harvest --listing-url https://imprintnews.org/topic/child-welfare-2
///
/// # Everything from a config file, four article downloads at a time
/// archive_harvest -c harvest.yaml --concurrency 4
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Topic listing page to expand
    #[arg(short, long, env = "HARVEST_LISTING_URL")]
    pub listing_url: Option<String>,

    /// Link-list checkpoint; collection is skipped when it exists
    #[arg(long)]
    pub links_file: Option<PathBuf>,

    /// Directory holding cached article pages
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// CSV file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the records as JSON
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// User-Agent header sent with every article request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Maximum number of load-more clicks
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub request_timeout: Option<u64>,

    /// Number of articles fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// WebDriver server endpoint (e.g. chromedriver)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub show_browser: bool,

    /// Ignore and do not write the article cache
    #[arg(long)]
    pub no_cache: bool,

    /// Disable politeness pauses (only for local testing)
    #[arg(long)]
    pub no_delay: bool,
}

impl Cli {
    /// Load the config file, if any, and apply the command-line overrides.
    pub fn load_config(&self) -> Result<HarvestConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => HarvestConfig::from_yaml_file(path)?,
            None => HarvestConfig::default(),
        };
        Ok(self.apply(config))
    }

    pub fn apply(&self, mut config: HarvestConfig) -> HarvestConfig {
        if let Some(url) = &self.listing_url {
            config.listing_url = Some(url.clone());
        }
        if let Some(path) = &self.links_file {
            config.links_file = path.clone();
        }
        if let Some(path) = &self.cache_dir {
            config.cache_dir = path.clone();
        }
        if let Some(path) = &self.output {
            config.output_csv = path.clone();
        }
        if let Some(path) = &self.json_output {
            config.output_json = Some(path.clone());
        }
        if let Some(ua) = &self.user_agent {
            config.headers.insert("User-Agent".to_string(), ua.clone());
        }
        if let Some(cap) = self.max_iterations {
            config.max_iterations = cap;
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout_secs = secs;
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if self.show_browser {
            config.headless = false;
        }
        if self.no_cache {
            config.use_cache = false;
        }
        if self.no_delay {
            config.pacing = PacingConfig::none();
        }
        config
    }
}
