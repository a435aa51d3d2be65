//! nexus - on-demand torrent indexer aggregating several search sites

pub mod config;
pub mod log;
pub mod registry;
pub mod scrapers;

pub use config::{ConfigError, Settings};
pub use registry::{Dispatch, Registry, RegistryError};
pub use scrapers::{Entry, ResultSet, ScrapeError, Scraper, SiteConfig};
