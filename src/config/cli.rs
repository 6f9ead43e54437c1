use crate::adapters::sink::OutputFormat;
use crate::config::toml_config::TomlConfig;
use crate::core::scrape::FailurePolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "windsite-etl")]
#[command(about = "Reanalysis wind data retrieval and wind generator catalogue scraping")]
pub struct Cli {
    /// Path to a TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Log process CPU and memory usage
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Retrieve one reanalysis file per month of the year range
    Fetch(FetchArgs),
    /// Scrape generator specification tables into a JSON file
    Scrape(ScrapeArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct FetchArgs {
    /// First year to retrieve (inclusive)
    #[arg(long)]
    pub year_start: Option<i32>,

    /// Last year to retrieve (inclusive)
    #[arg(long)]
    pub year_end: Option<i32>,

    /// Directory the period files are written to
    #[arg(long)]
    pub output_dir: Option<String>,

    /// List the requests without sending them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ScrapeArgs {
    /// Output file for the scraped records
    #[arg(short, long)]
    pub output: Option<String>,

    /// array | concatenated
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// continue | abort
    #[arg(long)]
    pub on_failure: Option<FailurePolicy>,

    /// List the products without fetching them
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Applies command line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.log_json {
            config.monitoring.log_json = true;
        }

        match &self.command {
            Command::Fetch(args) => {
                if let Some(year) = args.year_start {
                    config.fetch.year_start = year;
                    tracing::info!("🔧 fetch.year_start overridden to: {}", year);
                }
                if let Some(year) = args.year_end {
                    config.fetch.year_end = year;
                    tracing::info!("🔧 fetch.year_end overridden to: {}", year);
                }
                if let Some(dir) = &args.output_dir {
                    config.fetch.output_dir = dir.clone();
                    tracing::info!("🔧 fetch.output_dir overridden to: {}", dir);
                }
            }
            Command::Scrape(args) => {
                if let Some(output) = &args.output {
                    config.scrape.output_path = output.clone();
                    tracing::info!("🔧 scrape.output_path overridden to: {}", output);
                }
                if let Some(format) = args.format {
                    config.scrape.format = format;
                    tracing::info!("🔧 scrape.format overridden to: {:?}", format);
                }
                if let Some(policy) = args.on_failure {
                    config.scrape.on_failure = policy;
                    tracing::info!("🔧 scrape.on_failure overridden to: {:?}", policy);
                }
            }
        }
    }

    pub fn dry_run(&self) -> bool {
        match &self.command {
            Command::Fetch(args) => args.dry_run,
            Command::Scrape(args) => args.dry_run,
        }
    }
}
