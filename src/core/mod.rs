pub mod etl;
pub mod fetcher;
pub mod period;
pub mod scrape;
pub mod spec_table;

pub use crate::domain::model::{JobSummary, ProductRecord, ProductSpec, RetrievalRequest};
pub use crate::domain::ports::{Job, PageRenderer, RecordSink, RetrievalClient};
pub use crate::utils::error::Result;
