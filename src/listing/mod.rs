//! Discovery of article links on a paginated topic listing.
//!
//! The listing is expanded in two layers:
//!
//! 1. [`driver`]: the browser capability ([`PaginationDriver`]) that renders
//!    the page and clicks its load-more control, implemented for real
//!    browsers by [`webdriver::WebDriver`]
//! 2. [`collector`]: the loop that keeps clicking until the number of
//!    preview links stops growing
//!
//! [`links`] turns rendered markup into the ordered list of article URLs.

pub mod collector;
pub mod driver;
pub mod links;
pub mod webdriver;

pub use collector::{PaginationCollector, StopReason};
pub use driver::{DriverError, PaginationDriver};
