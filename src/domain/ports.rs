use crate::domain::model::{JobSummary, ProductRecord, RetrievalRequest};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Client for the reanalysis data service.
///
/// `retrieve` returns once the service has produced the file at `destination`
/// or has definitively failed to.
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    async fn retrieve(&self, request: &RetrievalRequest, destination: &Path) -> Result<()>;
}

/// Given a URL, return the rendered HTML of the page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}

/// Destination for scraped records, written one at a time.
#[async_trait]
pub trait RecordSink: Send {
    async fn append(&mut self, record: &ProductRecord) -> Result<()>;

    /// Flushes the sink and returns where the records went.
    async fn finish(&mut self) -> Result<String>;
}

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> Result<JobSummary>;
}
