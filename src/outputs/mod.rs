//! Artifacts written by a harvest run.
//!
//! # Submodules
//!
//! - [`links`]: the link-list checkpoint, one article URL per line
//! - [`table`]: the CSV table of article records
//! - [`json`]: an optional JSON export of the same records
//!
//! # Output Structure
//!
//! ```text
//! article_links.txt     # written once pagination completes
//! articles/
//! ├── some-story.html   # raw page cache, one file per article
//! └── other-story.html
//! articles.csv          # url,title,date,author,tags,type,text
//! articles.json         # optional
//! ```

pub mod json;
pub mod links;
pub mod table;
