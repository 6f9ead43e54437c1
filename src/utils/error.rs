use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Retrieval of {target} failed: {reason}")]
    RetrievalError { target: String, reason: String },

    #[error("Could not parse page {url}: {reason}")]
    ParseError { url: String, reason: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Io,
    Data,
    Provider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::SerializationError(_)
            | EtlError::ParseError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::RetrievalError { .. } => ErrorCategory::Provider,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路或服務端問題，重跑通常可以解決
            ErrorCategory::Network | ErrorCategory::Provider => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => "Check network connectivity and that the remote host is reachable",
            EtlError::IoError(_) => "Check that the output location exists and is writable",
            EtlError::SerializationError(_) => "The record could not be serialized; report this as a bug",
            EtlError::ConfigError { .. } | EtlError::ConfigValidationError { .. } => {
                "Review the TOML configuration file"
            }
            EtlError::MissingConfigError { .. } => {
                "Add the missing field to the configuration or export the referenced environment variable"
            }
            EtlError::InvalidConfigValueError { .. } => "Correct the highlighted configuration value",
            EtlError::RetrievalError { .. } => {
                "Verify the data service credentials and request parameters, then rerun the missing periods"
            }
            EtlError::ParseError { .. } => {
                "The page layout may have changed; check the container selector or use --on-failure continue"
            }
            EtlError::ProcessingError { .. } => "Inspect the logs with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(e) if e.is_timeout() => "The remote server took too long to answer".to_string(),
            EtlError::ApiError(e) if e.is_connect() => "Could not connect to the remote server".to_string(),
            EtlError::ApiError(e) => format!("Network request failed: {}", e),
            EtlError::IoError(e) => format!("File system error: {}", e),
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid configuration for '{}': {}", field, reason)
            }
            EtlError::MissingConfigError { field } => {
                format!("Configuration field '{}' is required", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
