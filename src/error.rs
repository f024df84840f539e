//! Error types for the PIM sync subsystem.

/// The main error type for PIM sync operations
#[derive(Debug, thiserror::Error)]
pub enum PimSyncError {
    /// The upstream catalog could not serve the requested product
    #[error("Upstream catalog error: {0}")]
    Upstream(String),

    /// The raw upstream product could not be converted to an internal record
    #[error("Transform error: {0}")]
    Transform(String),

    /// The product store rejected or failed a transactional write
    #[error("Store error: {0}")]
    Store(String),

    /// The queue backend failed an operation
    #[error("Queue error: {0}")]
    Queue(String),

    /// A configuration value could not be parsed; fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PimSyncError {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Convenient Result type alias using PimSyncError
pub type Result<T> = std::result::Result<T, PimSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PimSyncError::upstream("connection refused");
        assert_eq!(err.to_string(), "Upstream catalog error: connection refused");

        let err = PimSyncError::queue("LMOVE failed");
        assert_eq!(err.to_string(), "Queue error: LMOVE failed");
    }

    #[test]
    fn test_anyhow_conversion() {
        let source = anyhow::anyhow!("wrapped");
        let err: PimSyncError = source.into();
        assert_eq!(err.to_string(), "wrapped");
    }
}
