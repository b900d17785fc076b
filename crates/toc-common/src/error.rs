//! Error types for the layer resolution engine.

use thiserror::Error;

/// Result type alias using TocError.
pub type TocResult<T> = Result<T, TocError>;

/// Primary error type for layer resolution and persistence.
#[derive(Debug, Error)]
pub enum TocError {
    // === Source Errors ===
    #[error("Malformed capability source: {0}")]
    MalformedSource(String),

    #[error("Skipped record '{record}': {reason}")]
    SkippableRecord { record: String, reason: String },

    #[error("Resolution pass {0} was superseded")]
    StaleGeneration(u64),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    // === State Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),
}

impl TocError {
    /// Build a skippable-record error for a named entry.
    pub fn skippable(record: impl Into<String>, reason: impl Into<String>) -> Self {
        TocError::SkippableRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// Whether the batch that produced this error may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TocError::SkippableRecord { .. } | TocError::StaleGeneration(_)
        )
    }

    /// Short machine-readable code, used in CLI output and logs.
    pub fn code(&self) -> &'static str {
        match self {
            TocError::MalformedSource(_) => "MalformedSource",
            TocError::SkippableRecord { .. } => "SkippableRecord",
            TocError::StaleGeneration(_) => "StaleGeneration",
            TocError::Fetch { .. } => "FetchFailed",
            TocError::Storage(_) => "StorageError",
            TocError::Config(_) => "InvalidConfig",
            TocError::Serialization(_) => "SerializationError",
            TocError::LayerNotFound(_) => "LayerNotDefined",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for TocError {
    fn from(err: std::io::Error) -> Self {
        TocError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TocError {
    fn from(err: serde_json::Error) -> Self {
        TocError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for TocError {
    fn from(err: serde_yaml::Error) -> Self {
        TocError::Config(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants() {
        assert!(TocError::skippable("parcels", "missing Name").is_recoverable());
        assert!(TocError::StaleGeneration(3).is_recoverable());
        assert!(!TocError::MalformedSource("no Capability".into()).is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = TocError::Fetch {
            url: "https://example.com/wms".to_string(),
            message: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "Fetch failed for https://example.com/wms: timeout");
        assert_eq!(err.code(), "FetchFailed");
    }
}
