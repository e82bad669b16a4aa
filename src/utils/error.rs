use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Failed to read input '{source_name}': {message}")]
    ReadError {
        source_name: String,
        message: String,
    },

    #[error("Failed to write output '{path}': {message}")]
    WriteError { path: String, message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Output,
    Configuration,
    System,
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
            EtlError::ReadError { .. } | EtlError::SerializationError(_) => ErrorCategory::Input,
            EtlError::WriteError { .. } | EtlError::CsvError(_) => ErrorCategory::Output,
            EtlError::TomlError(_)
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Exit code for the CLI, derived from severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ReadError { .. } | EtlError::SerializationError(_) => {
                "Check that the input file exists and contains a JSON array or JSON-Lines records"
            }
            EtlError::WriteError { .. } | EtlError::CsvError(_) => {
                "Check that the output directory is writable and has free space"
            }
            EtlError::TomlError(_) => "Check the TOML configuration file syntax",
            EtlError::ConfigValidationError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Fix the reported configuration field and re-run"
            }
            EtlError::IoError(_) => "Check file permissions and paths",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ReadError { source_name, .. } => {
                format!("Could not read product feed '{}'", source_name)
            }
            EtlError::WriteError { path, .. } => format!("Could not write output '{}'", path),
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            EtlError::ConfigValidationError { field, message } => {
                format!("Invalid setting '{}': {}", field, message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
