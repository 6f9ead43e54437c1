use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Section name -> (label -> value), as flattened from a specifications table.
pub type Specifications = BTreeMap<String, BTreeMap<String, String>>;

/// One fully parameterised request to the reanalysis data service.
///
/// Keys are kept ordered so the request body and logs are stable between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalRequest {
    params: BTreeMap<String, String>,
}

impl RetrievalRequest {
    /// Fixed parameters first, then the period fields on top of them.
    pub fn new(fixed: &BTreeMap<String, String>, request_dates: String, target: String) -> Self {
        let mut params = fixed.clone();
        params.insert("date".to_string(), request_dates);
        params.insert("target".to_string(), target);
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn target(&self) -> &str {
        self.get("target").unwrap_or_default()
    }

    pub fn dates(&self) -> &str {
        self.get("date").unwrap_or_default()
    }

    pub fn dataset(&self) -> Option<&str> {
        self.get("dataset")
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

/// Static metadata for one product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub url: String,
    pub model: String,
    pub price: serde_json::Number,
}

/// Scraped record for one product.
///
/// Field order matches the sorted key order of the serialized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "MANUFACTURER")]
    pub manufacturer: String,
    #[serde(rename = "MODEL")]
    pub model: String,
    #[serde(rename = "PRICE")]
    pub price: serde_json::Number,
    #[serde(rename = "SPECIFICATIONS")]
    pub specifications: Specifications,
}

impl ProductRecord {
    pub fn new(manufacturer: &str, product: &ProductSpec, specifications: Specifications) -> Self {
        Self {
            manufacturer: manufacturer.to_string(),
            model: product.model.clone(),
            price: product.price.clone(),
            specifications,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub requested: usize,
    pub succeeded: usize,
    pub failed_targets: Vec<String>,
    pub output_dir: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    pub processed: usize,
    pub written: usize,
    pub failed_urls: Vec<String>,
    pub output_path: String,
}

/// What a finished job hands back to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobSummary {
    Fetch(FetchReport),
    Scrape(ScrapeReport),
}

impl JobSummary {
    pub fn failures(&self) -> usize {
        match self {
            JobSummary::Fetch(report) => report.failed_targets.len(),
            JobSummary::Scrape(report) => report.failed_urls.len(),
        }
    }

    pub fn output_location(&self) -> &str {
        match self {
            JobSummary::Fetch(report) => &report.output_dir,
            JobSummary::Scrape(report) => &report.output_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_request_period_fields_override_fixed() {
        let mut fixed = BTreeMap::new();
        fixed.insert("class".to_string(), "ei".to_string());
        fixed.insert("date".to_string(), "stale".to_string());

        let request = RetrievalRequest::new(
            &fixed,
            "19930101/TO/19930131".to_string(),
            "interim_daily_199301.grb".to_string(),
        );

        assert_eq!(request.get("class"), Some("ei"));
        assert_eq!(request.dates(), "19930101/TO/19930131");
        assert_eq!(request.target(), "interim_daily_199301.grb");
        assert_eq!(request.params().len(), 3);
    }

    #[test]
    fn test_product_record_serializes_sorted_upper_keys() {
        let product = ProductSpec {
            url: "https://example.com/i-300".to_string(),
            model: "i-300 12V".to_string(),
            price: 189.into(),
        };
        let record = ProductRecord::new("IstaBreeze", &product, Specifications::new());

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"MANUFACTURER":"IstaBreeze","MODEL":"i-300 12V","PRICE":189,"SPECIFICATIONS":{}}"#
        );
    }
}
