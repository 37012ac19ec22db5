//! Harvest configuration.
//!
//! A [`HarvestConfig`] can be loaded from a YAML file and is then overridden
//! by command-line flags (see [`crate::cli::Cli::apply`]). Validation turns the
//! raw configuration into ready-to-use pieces: compiled selectors, a header
//! map for the HTTP client, and checked delay ranges.
//!
//! # Example file
//!
//! ```yaml
//! listing_url: https://imprintnews.org/topic/child-welfare-2
//! links_file: imprint_child-welfare_article_links.txt
//! cache_dir: articles
//! output_csv: imprint_articles.csv
//! headers:
//!   User-Agent: "Mozilla/5.0 ..."
//! pacing:
//!   interaction: { min_ms: 3000, max_ms: 12000 }
//! selectors:
//!   load_more: .alm-load-more-btn
//! ```

use once_cell::sync::Lazy;
use rand::{Rng, rng};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::Selector;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/104.0.5112.79 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no listing URL configured (pass --listing-url or set listing_url in the config file)")]
    MissingListingUrl,
    #[error("listing URL {0:?} is not an absolute URL: {1}")]
    InvalidListingUrl(String, url::ParseError),
    #[error("delay range `{name}` has min_ms {min_ms} greater than max_ms {max_ms}")]
    InvalidDelay {
        name: &'static str,
        min_ms: u64,
        max_ms: u64,
    },
    #[error("selector `{name}` = {css:?} does not parse")]
    InvalidSelector { name: &'static str, css: String },
    #[error("invalid request header {0:?}")]
    InvalidHeader(String),
    #[error("`{0}` must be at least 1")]
    Zero(&'static str),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Inclusive range of milliseconds a pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min_ms: min * 1000,
            max_ms: max * 1000,
        }
    }

    pub const ZERO: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    /// Draw a uniformly random pause from the range.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng().random_range(self.min_ms..=self.max_ms))
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidDelay {
                name,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }
}

/// Politeness pauses around listing interactions and article requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Before each load-more attempt.
    pub interaction: DelayRange,
    /// Between hovering the footer and clicking load more.
    pub hover: DelayRange,
    /// After a load-more click, while new previews render.
    pub settle: DelayRange,
    /// Before each network fetch of an article.
    pub request: DelayRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            interaction: DelayRange::from_secs(3, 12),
            hover: DelayRange::from_secs(1, 3),
            settle: DelayRange::from_secs(3, 12),
            request: DelayRange::from_secs(1, 5),
        }
    }
}

impl PacingConfig {
    pub fn none() -> Self {
        Self {
            interaction: DelayRange::ZERO,
            hover: DelayRange::ZERO,
            settle: DelayRange::ZERO,
            request: DelayRange::ZERO,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.interaction.validate("interaction")?;
        self.hover.validate("hover")?;
        self.settle.validate("settle")?;
        self.request.validate("request")
    }
}

/// CSS markers identifying listing and article elements on the site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub preview_link: String,
    pub title: String,
    pub date: String,
    pub author: String,
    pub tags_container: String,
    pub tag_link: String,
    pub content: String,
    pub paragraph: String,
    pub footer: String,
    pub load_more: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            preview_link: "a.article-preview-link".into(),
            title: "h1".into(),
            date: ".pf-date".into(),
            author: "author".into(),
            tags_container: ".article-tags".into(),
            tag_link: "a".into(),
            content: ".article-content".into(),
            paragraph: "p".into(),
            footer: ".body--footer".into(),
            load_more: ".alm-load-more-btn".into(),
        }
    }
}

/// [`SiteSelectors`] parsed into reusable [`Selector`]s.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub preview_link: Selector,
    pub title: Selector,
    pub date: Selector,
    pub author: Selector,
    pub tags_container: Selector,
    pub tag_link: Selector,
    pub content: Selector,
    pub paragraph: Selector,
}

fn compile(name: &'static str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|_| ConfigError::InvalidSelector {
        name,
        css: css.to_string(),
    })
}

impl SiteSelectors {
    pub fn compile(&self) -> Result<CompiledSelectors, ConfigError> {
        // Interaction markers are only sent to the browser, but a typo there
        // should still fail before the run starts.
        compile("footer", &self.footer)?;
        compile("load_more", &self.load_more)?;
        Ok(CompiledSelectors {
            preview_link: compile("preview_link", &self.preview_link)?,
            title: compile("title", &self.title)?,
            date: compile("date", &self.date)?,
            author: compile("author", &self.author)?,
            tags_container: compile("tags_container", &self.tags_container)?,
            tag_link: compile("tag_link", &self.tag_link)?,
            content: compile("content", &self.content)?,
            paragraph: compile("paragraph", &self.paragraph)?,
        })
    }
}

/// Selectors for the default site profile, compiled on first use.
pub static DEFAULT_SELECTORS: Lazy<CompiledSelectors> = Lazy::new(|| {
    SiteSelectors::default()
        .compile()
        .expect("default selectors are valid CSS")
});

/// Everything a harvest run needs to know.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub listing_url: Option<String>,
    pub links_file: PathBuf,
    pub cache_dir: PathBuf,
    pub output_csv: PathBuf,
    pub output_json: Option<PathBuf>,
    pub headers: BTreeMap<String, String>,
    pub pacing: PacingConfig,
    pub max_iterations: usize,
    pub request_timeout_secs: u64,
    pub interaction_timeout_secs: u64,
    pub concurrency: usize,
    pub use_cache: bool,
    pub webdriver_url: String,
    pub headless: bool,
    pub selectors: SiteSelectors,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        Self {
            listing_url: None,
            links_file: PathBuf::from("article_links.txt"),
            cache_dir: PathBuf::from("articles"),
            output_csv: PathBuf::from("articles.csv"),
            output_json: None,
            headers,
            pacing: PacingConfig::default(),
            max_iterations: 1000,
            request_timeout_secs: 30,
            interaction_timeout_secs: 60,
            concurrency: 1,
            use_cache: true,
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            selectors: SiteSelectors::default(),
        }
    }
}

impl HarvestConfig {
    /// Load a configuration file; missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Check the configuration and derive the runtime settings.
    pub fn validate(self) -> Result<Settings, ConfigError> {
        let raw_url = self.listing_url.clone().ok_or(ConfigError::MissingListingUrl)?;
        let listing_url =
            Url::parse(&raw_url).map_err(|e| ConfigError::InvalidListingUrl(raw_url, e))?;
        self.pacing.validate()?;
        if self.max_iterations == 0 {
            return Err(ConfigError::Zero("max_iterations"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Zero("concurrency"));
        }
        let selectors = if self.selectors == SiteSelectors::default() {
            DEFAULT_SELECTORS.clone()
        } else {
            self.selectors.compile()?
        };
        let headers = header_map(&self.headers)?;
        Ok(Settings {
            listing_url,
            selectors,
            headers,
            config: self,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs)
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader(value.clone()))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// A validated [`HarvestConfig`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub listing_url: Url,
    pub selectors: CompiledSelectors,
    pub headers: HeaderMap,
    pub config: HarvestConfig,
}
