use thiserror::Error;

/// Main error type for the AffinityLoop system
#[derive(Error, Debug)]
pub enum AlError {
    #[error("Design error: {0}")]
    Design(#[from] DesignError),

    #[error("Assay error: {0}")]
    Assay(#[from] AssayError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Automation error: {0}")]
    Automation(#[from] AutomationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Candidate-design errors (generator and surrogate inputs)
#[derive(Error, Debug)]
pub enum DesignError {
    #[error("Invalid batch size: {requested} (must be at least 1)")]
    InvalidBatchSize { requested: usize },

    #[error("Mutation site pool too small: {available} sites, need at least 2")]
    MutationPoolTooSmall { available: usize },

    #[error("Empty residue alphabet after excluding current residue at position {position}")]
    EmptyAlphabet { position: u32 },
}

/// Assay synthesis errors
#[derive(Error, Debug)]
pub enum AssayError {
    #[error("No variants supplied for assay execution")]
    EmptyVariantList,

    #[error("Observation already recorded for variant {variant_id}")]
    ObservationAlreadyRecorded { variant_id: String },
}

/// Persistence / object-store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {kind} key {key}")]
    NotFound { kind: String, key: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Corrupt record for {kind} key {key}: {message}")]
    Corrupt {
        kind: String,
        key: String,
        message: String,
    },
}

/// Lab-automation collaborator errors
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("No variants provided for sample preparation")]
    NoVariants,

    #[error("Protocol simulation failed: {message}")]
    SimulationFailed { message: String },
}

/// Result type alias for AffinityLoop operations
pub type AlResult<T> = Result<T, AlError>;

/// Macro for creating invalid-input errors
#[macro_export]
macro_rules! invalid_input {
    ($($arg:tt)*) => {
        $crate::AlError::InvalidInput(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::AlError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DesignError::MutationPoolTooSmall { available: 1 };
        assert!(error.to_string().contains("too small"));
        assert!(error.to_string().contains('1'));
    }

    #[test]
    fn test_error_conversion() {
        let design_error = DesignError::InvalidBatchSize { requested: 0 };
        let al_error: AlError = design_error.into();

        match al_error {
            AlError::Design(_) => (),
            _ => panic!("Expected Design error"),
        }
    }

    #[test]
    fn test_macros() {
        let _invalid = invalid_input!("batch size {} out of range", 0);
        let _internal = internal_error!("unexpected state");
    }
}
