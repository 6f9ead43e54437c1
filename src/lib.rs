pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use config::TomlConfig;

pub use adapters::{EcmwfClient, FileSink, HttpPageRenderer};
pub use core::{etl::EtlEngine, fetcher::BatchFetcher, scrape::ScrapeJob};
pub use utils::error::{EtlError, Result};
