use crate::core::period::{PeriodRange, TargetNaming};
use crate::domain::model::{FetchReport, JobSummary, RetrievalRequest};
use crate::domain::ports::{Job, RetrievalClient};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub range: PeriodRange,
    pub naming: TargetNaming,
    /// Parameters sent unchanged with every period.
    pub fixed_params: BTreeMap<String, String>,
    pub output_dir: PathBuf,
}

/// Issues one retrieval per month of the configured range, in order.
pub struct BatchFetcher<C: RetrievalClient> {
    client: C,
    settings: FetchSettings,
}

impl<C: RetrievalClient> BatchFetcher<C> {
    pub fn new(client: C, settings: FetchSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Every request the run would send, without sending any.
    pub fn plan(&self) -> Vec<RetrievalRequest> {
        self.settings
            .range
            .iter()
            .map(|period| {
                RetrievalRequest::new(
                    &self.settings.fixed_params,
                    period.request_dates(),
                    period.target(&self.settings.naming),
                )
            })
            .collect()
    }

    pub async fn fetch_all(&self) -> Result<FetchReport> {
        let requests = self.plan();
        let mut report = FetchReport {
            requested: requests.len(),
            output_dir: self.settings.output_dir.display().to_string(),
            ..Default::default()
        };

        tracing::info!(
            "📡 Retrieving {} periods ({}..={})",
            requests.len(),
            self.settings.range.year_start(),
            self.settings.range.year_end()
        );

        for (index, request) in requests.iter().enumerate() {
            let destination = self.settings.output_dir.join(request.target());
            tracing::info!(
                "[{}/{}] Requesting {} -> {}",
                index + 1,
                requests.len(),
                request.dates(),
                request.target()
            );

            // 不重試：失敗的月份只記錄下來，繼續下一個
            match self.client.retrieve(request, &destination).await {
                Ok(()) => {
                    report.succeeded += 1;
                    tracing::debug!("Saved {}", destination.display());
                }
                Err(e) => {
                    tracing::warn!("⚠️ {} was not produced: {}", request.target(), e);
                    report.failed_targets.push(request.target().to_string());
                }
            }
        }

        Ok(report)
    }
}

#[async_trait::async_trait]
impl<C: RetrievalClient> Job for BatchFetcher<C> {
    fn name(&self) -> &str {
        "fetch"
    }

    async fn run(&self) -> Result<JobSummary> {
        tokio::fs::create_dir_all(&self.settings.output_dir).await?;
        Ok(JobSummary::Fetch(self.fetch_all().await?))
    }
}
