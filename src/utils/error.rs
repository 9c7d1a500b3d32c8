use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Error loading data: {message}")]
    DataLoadError { message: String },

    #[error("Missing column: {column}")]
    MissingColumnError { column: String },

    #[error("Error converting {column} to {dtype}: {message}")]
    ConversionError {
        column: String,
        dtype: String,
        message: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Data,
    Output,
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
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::DataLoadError { .. } | EtlError::CsvError(_) => ErrorCategory::Input,
            EtlError::MissingColumnError { .. }
            | EtlError::ConversionError { .. } => ErrorCategory::Data,
            EtlError::ZipError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                ErrorCategory::Output
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ConversionError { .. } => ErrorSeverity::Low,
            EtlError::DataLoadError { .. } | EtlError::CsvError(_) => ErrorSeverity::Medium,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingColumnError { .. } => ErrorSeverity::High,
            EtlError::ZipError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::DataLoadError { .. } | EtlError::CsvError(_) => {
                "Check that the input file exists and is a valid CSV export of the spreadsheet"
                    .to_string()
            }
            EtlError::MissingColumnError { column } => format!(
                "Add a '{}' column to the input (headers are normalised to lower_snake_case)",
                column
            ),
            EtlError::ConversionError { column, .. } => {
                format!("Clean the values of '{}' before converting it", column)
            }
            EtlError::ConfigValidationError { field, .. }
            | EtlError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' setting and run again", field)
            }
            EtlError::ZipError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                "Check that the output path is writable and has free space".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Could not read input data: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::Output => format!("Could not write output: {}", self),
        }
    }

    /// Process exit code for this error; `Low` severity counts as success.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
