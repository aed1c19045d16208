//! Error taxonomy for the index protocol and search core.
//!
//! Every failure that crosses a public API is one of the [`IndexError`]
//! variants. Codec and resource failures carry the resource name (and the
//! chunk counter where one applies) so a failed sync can be diagnosed from
//! the message alone.

use thiserror::Error;

/// Boxed error produced by caller-supplied filters and post-processors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Malformed or version-incompatible chunk/manifest content.
    #[error("Invalid format in {resource}: {reason}")]
    Format { resource: String, reason: String },

    /// The manifest or chunk does not exist (distinct from an I/O failure).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// I/O failure while reading a resource. Retryable.
    #[error("Transport failure on {resource}: {source}")]
    Transport {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// A write stream could not be opened or completed.
    #[error("Write failure on {resource}: {source}")]
    Write {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// Store or configuration inconsistency detected up front.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A caller-supplied filter or post-processor failed.
    #[error("Filter failed: {0}")]
    Filter(#[source] BoxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub fn format(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        IndexError::Format {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(resource: impl Into<String>, source: std::io::Error) -> Self {
        IndexError::Transport {
            resource: resource.into(),
            source,
        }
    }

    pub fn write(resource: impl Into<String>, source: std::io::Error) -> Self {
        IndexError::Write {
            resource: resource.into(),
            source,
        }
    }

    /// Stable error code for CLI output and logs.
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Format { .. } => "FORMAT_ERROR",
            IndexError::NotFound(_) => "NOT_FOUND",
            IndexError::Transport { .. } => "TRANSPORT_FAILURE",
            IndexError::Write { .. } => "WRITE_FAILURE",
            IndexError::Validation(_) => "VALIDATION_ERROR",
            IndexError::Filter(_) => "FILTER_FAULT",
            IndexError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::Transport { .. } | IndexError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_kind() {
        let errors = [
            IndexError::format("a.gz", "bad version"),
            IndexError::NotFound("a.properties".into()),
            IndexError::transport("a.gz", std::io::Error::other("reset")),
            IndexError::write("a.gz", std::io::Error::other("disk full")),
            IndexError::Validation("mismatch".into()),
            IndexError::Filter("boom".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(IndexError::transport("x", std::io::Error::other("t")).is_retryable());
        assert!(!IndexError::format("x", "y").is_retryable());
        assert!(!IndexError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_message_carries_resource_name() {
        let err = IndexError::format("central.3.gz", "truncated record");
        assert!(err.to_string().contains("central.3.gz"));
    }
}
