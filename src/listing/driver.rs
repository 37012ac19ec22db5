//! The browser capability the pagination loop depends on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("webdriver request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webdriver returned `{code}`: {message}")]
    Protocol { code: String, message: String },
    #[error("unexpected webdriver response: {0}")]
    Malformed(String),
    #[error("driver did not respond within {0:?}")]
    Timeout(std::time::Duration),
    #[error("no browser session is open")]
    NoSession,
}

impl DriverError {
    /// The element the driver was asked for is not on the page.
    pub fn is_missing_element(&self) -> bool {
        matches!(self, DriverError::Protocol { code, .. } if code == "no such element")
    }
}

/// An interactive browser that can render a listing page and reveal more of it.
pub trait PaginationDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// The markup of the page as currently rendered.
    async fn current_markup(&mut self) -> Result<String, DriverError>;

    /// Locate and activate the load-more control.
    ///
    /// Returns `Ok(false)` when the control is no longer on the page.
    async fn trigger_load_more(&mut self) -> Result<bool, DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;
}
