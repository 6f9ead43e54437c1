use crate::adapters::ecmwf::ServerConfig;
use crate::adapters::renderer::LanguagePreference;
use crate::adapters::sink::OutputFormat;
use crate::config::defaults;
use crate::core::fetcher::FetchSettings;
use crate::core::period::{PeriodRange, TargetNaming};
use crate::core::scrape::{FailurePolicy, ScrapeSettings};
use crate::core::spec_table::DEFAULT_CONTAINER_SELECTOR;
use crate::domain::model::ProductSpec;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub fetch: FetchConfig,
    pub scrape: ScrapeConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub year_start: i32,
    pub year_end: i32,
    pub output_dir: String,
    pub server: ServerConfig,
    pub naming: TargetNaming,
    /// Fixed request fields. A `[fetch.request]` table replaces the built-in set.
    pub request: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            year_start: defaults::YEAR_START,
            year_end: defaults::YEAR_END,
            output_dir: defaults::FETCH_OUTPUT_DIR.to_string(),
            server: ServerConfig::default(),
            naming: TargetNaming::default(),
            request: defaults::interim_request(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub manufacturer: String,
    pub output_path: String,
    pub format: OutputFormat,
    pub on_failure: FailurePolicy,
    pub container_selector: String,
    pub timeout_seconds: u64,
    pub language: LanguagePreference,
    pub products: Vec<ProductSpec>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            manufacturer: defaults::MANUFACTURER.to_string(),
            output_path: defaults::SCRAPE_OUTPUT_PATH.to_string(),
            format: OutputFormat::default(),
            on_failure: FailurePolicy::default(),
            container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
            timeout_seconds: defaults::SCRAPE_TIMEOUT_SECONDS,
            language: LanguagePreference::default(),
            products: defaults::generators(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Config file when given, built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_toml_str(""),
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: TomlConfig =
            toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        // 預設值裡的 ${VAR} 也要替換
        let server = &mut config.fetch.server;
        server.url = Self::substitute_env_vars(&server.url)?;
        server.key = Self::substitute_env_vars(&server.key)?;
        server.email = Self::substitute_env_vars(&server.email)?;

        Ok(config)
    }

    /// 替換環境變數 (例如 ${ECMWF_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl FetchConfig {
    pub fn range(&self) -> Result<PeriodRange> {
        PeriodRange::new(self.year_start, self.year_end)
    }

    /// Checks what is needed to list the requests; credentials are not required.
    pub fn validate_plan(&self) -> Result<()> {
        validation::validate_range("fetch.year_start", self.year_start, 1, 9999)?;
        validation::validate_range("fetch.year_end", self.year_end, 1, 9999)?;
        self.range()?;
        validation::validate_path("fetch.output_dir", &self.output_dir)?;
        validation::validate_non_empty_string("fetch.naming.extension", &self.naming.extension)?;

        if !self.request.contains_key("dataset") {
            return Err(EtlError::MissingConfigError {
                field: "fetch.request.dataset".to_string(),
            });
        }
        Ok(())
    }

    pub fn settings(&self) -> Result<FetchSettings> {
        Ok(FetchSettings {
            range: self.range()?,
            naming: self.naming.clone(),
            fixed_params: self.request.clone(),
            output_dir: PathBuf::from(&self.output_dir),
        })
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> Result<()> {
        self.validate_plan()?;
        validation::validate_url("fetch.server.url", &self.server.url)?;
        validation::validate_resolved("fetch.server.key", &self.server.key)?;
        validation::validate_resolved("fetch.server.email", &self.server.email)?;
        validation::validate_range(
            "fetch.server.poll_interval_seconds",
            self.server.poll_interval_seconds,
            1,
            3600,
        )?;
        Ok(())
    }
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            manufacturer: self.manufacturer.clone(),
            products: self.products.clone(),
            container_selector: self.container_selector.clone(),
            on_failure: self.on_failure,
        }
    }
}

impl Validate for ScrapeConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("scrape.manufacturer", &self.manufacturer)?;
        validation::validate_path("scrape.output_path", &self.output_path)?;
        validation::validate_range("scrape.timeout_seconds", self.timeout_seconds, 1, 3600)?;

        if scraper::Selector::parse(&self.container_selector).is_err() {
            return Err(EtlError::InvalidConfigValueError {
                field: "scrape.container_selector".to_string(),
                value: self.container_selector.clone(),
                reason: "Not a valid CSS selector".to_string(),
            });
        }

        if self.language.enabled {
            validation::validate_non_empty_string("scrape.language.form_id", &self.language.form_id)?;
            validation::validate_non_empty_string("scrape.language.field", &self.language.field)?;
        }

        if self.products.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "scrape.products".to_string(),
            });
        }
        for product in &self.products {
            validation::validate_url("scrape.products.url", &product.url)?;
            validation::validate_non_empty_string("scrape.products.model", &product.model)?;
        }
        validation::validate_unique(
            "scrape.products.url",
            self.products.iter().map(|p| p.url.as_str()),
        )?;

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("job.name", &self.job.name)?;
        self.fetch.validate()?;
        self.scrape.validate()
    }
}
