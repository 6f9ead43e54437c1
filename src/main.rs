use clap::Parser;
use windsite_etl::config::TomlConfig;
use windsite_etl::core::fetcher::FetchSettings;
use windsite_etl::domain::model::JobSummary;
use windsite_etl::domain::ports::Job;
use windsite_etl::utils::error::{ErrorSeverity, EtlError};
use windsite_etl::utils::{logger, validation::Validate};
use windsite_etl::{
    BatchFetcher, Cli, Command, EcmwfClient, EtlEngine, FileSink, HttpPageRenderer, ScrapeJob,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // logger 要等配置載入後才知道格式
    let mut config = match TomlConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if cli.log_json || config.monitoring.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting windsite-etl");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    cli.apply_overrides(&mut config);

    let outcome = match &cli.command {
        Command::Fetch(_) => run_fetch(&cli, &config).await,
        Command::Scrape(_) => run_scrape(&cli, &config).await,
    };

    match outcome {
        Ok(Some(summary)) => report(&summary),
        Ok(None) => {}
        Err(e) => exit_with(e),
    }

    Ok(())
}

async fn run_fetch(cli: &Cli, config: &TomlConfig) -> windsite_etl::Result<Option<JobSummary>> {
    if cli.dry_run() {
        config.fetch.validate_plan()?;
        print_fetch_plan(&config.fetch.settings()?, config);
        return Ok(None);
    }

    config.fetch.validate()?;
    tracing::info!("✅ Configuration loaded and validated successfully");

    let client = EcmwfClient::new(&config.fetch.server)?;
    let fetcher = BatchFetcher::new(client, config.fetch.settings()?);
    run_job(fetcher, config.monitoring.enabled).await.map(Some)
}

async fn run_scrape(cli: &Cli, config: &TomlConfig) -> windsite_etl::Result<Option<JobSummary>> {
    config.scrape.validate()?;

    if cli.dry_run() {
        print_scrape_plan(config);
        return Ok(None);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    let language = Some(config.scrape.language.clone());
    let renderer = HttpPageRenderer::new(language, config.scrape.timeout())?;
    let sink = FileSink::open(&config.scrape.output_path, config.scrape.format).await?;
    let job = ScrapeJob::new(renderer, sink, config.scrape.settings());
    run_job(job, config.monitoring.enabled).await.map(Some)
}

async fn run_job<J: Job>(job: J, monitor_enabled: bool) -> windsite_etl::Result<JobSummary> {
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }
    EtlEngine::new_with_monitoring(job, monitor_enabled).run().await
}

fn print_fetch_plan(settings: &FetchSettings, config: &TomlConfig) {
    println!("📋 Fetch plan ({}):", config.job.name);
    println!("  Server: {}", config.fetch.server.url);
    println!("  Output: {}", settings.output_dir.display());
    println!(
        "  Years: {}..={} ({} requests)",
        settings.range.year_start(),
        settings.range.year_end(),
        settings.range.len()
    );

    for period in settings.range.iter() {
        println!(
            "  {} -> {}",
            period.request_dates(),
            period.target(&settings.naming)
        );
    }
}

fn print_scrape_plan(config: &TomlConfig) {
    println!("📋 Scrape plan ({}):", config.job.name);
    println!("  Output: {} ({:?})", config.scrape.output_path, config.scrape.format);
    println!("  On failure: {:?}", config.scrape.on_failure);
    for product in &config.scrape.products {
        println!("  {} ({}) {}", product.model, product.price, product.url);
    }
}

fn report(summary: &JobSummary) {
    println!("✅ Job completed");
    println!("📁 Output: {}", summary.output_location());

    match summary {
        JobSummary::Fetch(report) => {
            println!("  Retrieved {}/{} periods", report.succeeded, report.requested);
            for target in &report.failed_targets {
                println!("  ⚠️ missing: {}", target);
            }
        }
        JobSummary::Scrape(report) => {
            println!("  Wrote {}/{} records", report.written, report.processed);
            for url in &report.failed_urls {
                println!("  ⚠️ skipped: {}", url);
            }
        }
    }
}

fn exit_with(e: EtlError) -> ! {
    tracing::error!(
        "❌ Job failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
