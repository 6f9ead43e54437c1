use crate::domain::model::JobSummary;
use crate::domain::ports::Job;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<J: Job> {
    job: J,
    monitor: SystemMonitor,
}

impl<J: Job> EtlEngine<J> {
    pub fn new(job: J) -> Self {
        Self::new_with_monitoring(job, false)
    }

    pub fn new_with_monitoring(job: J, monitor_enabled: bool) -> Self {
        Self {
            job,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    pub async fn run(&self) -> Result<JobSummary> {
        tracing::info!("🚀 Starting {} job", self.job.name());
        self.monitor.log_stats("Start");

        let result = self.job.run().await;

        self.monitor.log_final_stats();
        let summary = result?;

        match &summary {
            JobSummary::Fetch(report) => tracing::info!(
                "Fetch finished: {}/{} periods retrieved in {:?}",
                report.succeeded,
                report.requested,
                self.monitor.elapsed()
            ),
            JobSummary::Scrape(report) => tracing::info!(
                "Scrape finished: {}/{} records written in {:?}",
                report.written,
                report.processed,
                self.monitor.elapsed()
            ),
        }

        if summary.failures() > 0 {
            tracing::warn!(
                "⚠️ {} item(s) failed during the {} job",
                summary.failures(),
                self.job.name()
            );
        }

        Ok(summary)
    }
}
