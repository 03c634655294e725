use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Rate provider rejected the request: {error_type}")]
    ProviderRejected { error_type: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Settings store error: {message}")]
    StorageError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Provider,
    Configuration,
    Storage,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ConverterError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) => ErrorCategory::Network,
            Self::ProviderRejected { .. } | Self::SerializationError(_) => ErrorCategory::Provider,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::PatternError(_) => ErrorCategory::Configuration,
            Self::IoError(_) | Self::StorageError { .. } => ErrorCategory::Storage,
            Self::ValidationError { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ValidationError { .. } | Self::ApiError(_) | Self::SerializationError(_) => {
                ErrorSeverity::Medium
            }
            Self::ProviderRejected { .. }
            | Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::StorageError { .. } | Self::PatternError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// Process exit code for a failed command. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check your network connection; rates refresh again on the next hourly run",
            ErrorCategory::Provider => "Verify the API key with `currency-lens configure --api-key <KEY>`",
            ErrorCategory::Configuration => "Review the config file and command line flags",
            ErrorCategory::Storage => "Check that the settings store path is readable and writable",
            ErrorCategory::Input => "Correct the input value and try again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ProviderRejected { error_type } if error_type == "invalid-key" => {
                "Invalid API key".to_string()
            }
            Self::ApiError(_) => "Could not reach the exchange rate provider".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConverterError>;
