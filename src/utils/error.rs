use thiserror::Error;

#[derive(Error, Debug)]
pub enum SorteoError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("No category rule configured for tier {category}")]
    UnknownCategory { category: String },

    #[error("Client not found: {identifier}")]
    ClientNotFound { identifier: String },

    #[error("Draw not found: {draw_id}")]
    DrawNotFound { draw_id: String },

    #[error("Ticket number {number} is already assigned (while issuing for client {client_id})")]
    DuplicateNumber { number: u32, client_id: String },

    #[error("Draw {draw_id} references ticket number {number}, which was never issued")]
    UnknownTicketNumber { number: u32, draw_id: String },

    #[error("Ticket number {number} was already consumed (draw {draw_id})")]
    TicketAlreadyConsumed { number: u32, draw_id: String },

    #[error("Draw {draw_id} is already finalized")]
    AlreadyFinalized { draw_id: String },

    #[error("Invalid result for draw {draw_id}: {reason}")]
    InvalidDrawResult { draw_id: String, reason: String },

    #[error("Engine state lock was poisoned by a panicking writer")]
    StatePoisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Configuration,
    Integrity,
    Input,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// CLI 結束碼，任何錯誤都不回傳 0
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 4,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl SorteoError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SorteoError::ClientNotFound { .. } | SorteoError::DrawNotFound { .. } => {
                ErrorCategory::NotFound
            }
            SorteoError::ConfigError { .. }
            | SorteoError::ConfigValidationError { .. }
            | SorteoError::InvalidConfigValueError { .. }
            | SorteoError::UnknownCategory { .. } => ErrorCategory::Configuration,
            SorteoError::DuplicateNumber { .. }
            | SorteoError::UnknownTicketNumber { .. }
            | SorteoError::TicketAlreadyConsumed { .. }
            | SorteoError::AlreadyFinalized { .. }
            | SorteoError::InvalidDrawResult { .. }
            | SorteoError::StatePoisoned => ErrorCategory::Integrity,
            SorteoError::ValidationError { .. } => ErrorCategory::Input,
            SorteoError::IoError(_)
            | SorteoError::SerializationError(_)
            | SorteoError::CsvError(_)
            | SorteoError::TomlSerializeError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NotFound => ErrorSeverity::Low,
            ErrorCategory::Input | ErrorCategory::Io => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Integrity => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Message safe to show an end user. Not-found errors never echo the
    /// identifier that was searched for.
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::NotFound => "No match found".to_string(),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Integrity => format!("Data integrity violation: {}", self),
            ErrorCategory::Input => format!("Invalid input: {}", self),
            ErrorCategory::Io => format!("Could not read or write data: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SorteoError::ClientNotFound { .. } => {
                "Check the CUIT or DNI and try again"
            }
            SorteoError::DrawNotFound { .. } => "Run `sorteo draws` to list the known draw ids",
            SorteoError::UnknownCategory { .. } => {
                "Add a [[categories]] rule for this tier to the configuration file"
            }
            SorteoError::DuplicateNumber { .. } => {
                "The ticket number space is inconsistent; inspect the configured tickets and first_ticket_number"
            }
            SorteoError::UnknownTicketNumber { .. } | SorteoError::InvalidDrawResult { .. } => {
                "Review the draw results; every winner must be an issued ticket and every prize must belong to the draw"
            }
            SorteoError::TicketAlreadyConsumed { .. } => {
                "A consumed ticket cannot win again; review the draw results"
            }
            SorteoError::AlreadyFinalized { .. } => {
                "Completed draws are final; schedule a new draw instead"
            }
            SorteoError::ValidationError { .. } => "Correct the input value and try again",
            SorteoError::StatePoisoned => "Restart the process and reload the configuration",
            SorteoError::ConfigError { .. }
            | SorteoError::ConfigValidationError { .. }
            | SorteoError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and try again"
            }
            SorteoError::IoError(_)
            | SorteoError::SerializationError(_)
            | SorteoError::CsvError(_)
            | SorteoError::TomlSerializeError(_) => {
                "Check that the file exists and that you have permission to access it"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SorteoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_hides_identifier() {
        let err = SorteoError::ClientNotFound {
            identifier: "30-71234567-8".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.user_friendly_message(), "No match found");
        assert!(!err.user_friendly_message().contains("30-71234567-8"));
    }

    #[test]
    fn test_integrity_errors_are_critical_and_not_retryable() {
        let err = SorteoError::TicketAlreadyConsumed {
            number: 1045,
            draw_id: "s3".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Integrity);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("1045"));
        assert!(err.to_string().contains("s3"));
    }

    #[test]
    fn test_lookup_miss_exits_non_zero() {
        let err = SorteoError::ClientNotFound {
            identifier: "99-99999999-9".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_ne!(err.severity().exit_code(), 0);

        let codes: Vec<i32> = [
            ErrorSeverity::Low,
            ErrorSeverity::Medium,
            ErrorSeverity::High,
            ErrorSeverity::Critical,
        ]
        .iter()
        .map(ErrorSeverity::exit_code)
        .collect();
        assert!(codes.iter().all(|&code| code != 0));
    }

    #[test]
    fn test_unknown_category_is_configuration_error() {
        let err = SorteoError::UnknownCategory {
            category: "GREMIO".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
