use crate::core::spec_table::parse_spec_table;
use crate::domain::model::{JobSummary, ProductRecord, ProductSpec, ScrapeReport};
use crate::domain::ports::{Job, PageRenderer, RecordSink};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::Mutex;

/// What to do when one product page cannot be rendered or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and move on to the next product.
    Continue,
    /// Stop the run at the first failure.
    #[default]
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(EtlError::InvalidConfigValueError {
                field: "scrape.on_failure".to_string(),
                value: other.to_string(),
                reason: "Valid values: continue, abort".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub manufacturer: String,
    pub products: Vec<ProductSpec>,
    pub container_selector: String,
    pub on_failure: FailurePolicy,
}

/// Renders each product page, flattens its specifications table and hands
/// the record straight to the sink.
pub struct ScrapeJob<R: PageRenderer, S: RecordSink> {
    renderer: R,
    sink: Mutex<S>,
    settings: ScrapeSettings,
}

impl<R: PageRenderer, S: RecordSink> ScrapeJob<R, S> {
    pub fn new(renderer: R, sink: S, settings: ScrapeSettings) -> Self {
        Self {
            renderer,
            sink: Mutex::new(sink),
            settings,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink.into_inner()
    }

    async fn scrape_one(&self, product: &ProductSpec) -> Result<ProductRecord> {
        let html = self.renderer.render(&product.url).await?;
        tracing::debug!("Rendered {} ({} bytes)", product.url, html.len());

        let specifications =
            parse_spec_table(&html, &self.settings.container_selector, &product.url)?;
        Ok(ProductRecord::new(
            &self.settings.manufacturer,
            product,
            specifications,
        ))
    }

    pub async fn scrape_all(&self) -> Result<ScrapeReport> {
        let total = self.settings.products.len();
        let mut report = ScrapeReport::default();
        let mut sink = self.sink.lock().await;

        for (index, product) in self.settings.products.iter().enumerate() {
            report.processed += 1;
            tracing::info!("[{}/{}] Scraping {}", index + 1, total, product.model);

            match self.scrape_one(product).await {
                Ok(record) => {
                    tracing::debug!(
                        "{} sections parsed for {}",
                        record.specifications.len(),
                        record.model
                    );
                    // 寫入失敗一律中止
                    sink.append(&record).await?;
                    report.written += 1;
                }
                Err(e) => match self.settings.on_failure {
                    FailurePolicy::Abort => {
                        tracing::error!("❌ {} failed, aborting: {}", product.url, e);
                        if let Err(finish_err) = sink.finish().await {
                            tracing::warn!("Could not close output: {}", finish_err);
                        }
                        return Err(e);
                    }
                    FailurePolicy::Continue => {
                        tracing::warn!("⚠️ Skipping {}: {}", product.url, e);
                        report.failed_urls.push(product.url.clone());
                    }
                },
            }
        }

        report.output_path = sink.finish().await?;
        Ok(report)
    }
}

#[async_trait::async_trait]
impl<R: PageRenderer, S: RecordSink> Job for ScrapeJob<R, S> {
    fn name(&self) -> &str {
        "scrape"
    }

    async fn run(&self) -> Result<JobSummary> {
        Ok(JobSummary::Scrape(self.scrape_all().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec_table::DEFAULT_CONTAINER_SELECTOR;
    use std::collections::HashMap;

    struct StaticRenderer {
        pages: HashMap<String, String>,
    }

    #[async_trait::async_trait]
    impl PageRenderer for StaticRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            self.pages.get(url).cloned().ok_or_else(|| EtlError::ProcessingError {
                message: format!("no page for {}", url),
            })
        }
    }

    #[derive(Default)]
    struct MemorySink {
        records: Vec<ProductRecord>,
        finished: bool,
    }

    #[async_trait::async_trait]
    impl RecordSink for MemorySink {
        async fn append(&mut self, record: &ProductRecord) -> Result<()> {
            self.records.push(record.clone());
            Ok(())
        }

        async fn finish(&mut self) -> Result<String> {
            self.finished = true;
            Ok("memory".to_string())
        }
    }

    fn page(section: &str, label: &str, value: &str) -> String {
        format!(
            r#"<div id="tab-attribute"><table>
                <thead><tr><td>{}</td></tr></thead>
                <tbody><tr><td>{}</td><td>{}</td></tr></tbody>
            </table></div>"#,
            section, label, value
        )
    }

    fn product(url: &str, model: &str, price: u64) -> ProductSpec {
        ProductSpec {
            url: url.to_string(),
            model: model.to_string(),
            price: price.into(),
        }
    }

    fn job(on_failure: FailurePolicy) -> ScrapeJob<StaticRenderer, MemorySink> {
        let mut pages = HashMap::new();
        pages.insert("a".to_string(), page("Rotor", "Diameter", "1.2 m"));
        pages.insert("b".to_string(), "<html><body>moved</body></html>".to_string());
        pages.insert("c".to_string(), page("Generator", "Voltage", "24 V"));

        ScrapeJob::new(
            StaticRenderer { pages },
            MemorySink::default(),
            ScrapeSettings {
                manufacturer: "IstaBreeze".to_string(),
                products: vec![
                    product("a", "i-300 12V", 189),
                    product("b", "L-500 24V", 229),
                    product("c", "i-700 24V", 369),
                ],
                container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
                on_failure,
            },
        )
    }

    #[tokio::test]
    async fn test_continue_policy_skips_broken_page() {
        let job = job(FailurePolicy::Continue);
        let report = job.scrape_all().await.unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.written, 2);
        assert_eq!(report.failed_urls, vec!["b"]);
        assert_eq!(report.output_path, "memory");

        let sink = job.into_sink();
        assert!(sink.finished);
        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.records[0].model, "i-300 12V");
        assert_eq!(sink.records[0].manufacturer, "IstaBreeze");
        assert_eq!(sink.records[0].specifications["Rotor"]["Diameter"], "1.2 m");
        assert_eq!(sink.records[1].price, serde_json::Number::from(369));
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_first_failure() {
        let job = job(FailurePolicy::Abort);
        let err = job.scrape_all().await.unwrap_err();

        assert!(matches!(err, EtlError::ParseError { ref url, .. } if url == "b"));

        let sink = job.into_sink();
        assert!(sink.finished);
        assert_eq!(sink.records.len(), 1);
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("continue".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        assert_eq!("ABORT".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }
}
