//! Error types for the ingestion and report-orchestration pipelines.
//!
//! Mirrors the crate's error-kind taxonomy (not_found, transient_upstream,
//! permanent_upstream, precondition, invalid_input, cancelled, internal)
//! across one `thiserror` enum per subsystem, all convertible into a single
//! crate-wide [`Error`].

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The seven error kinds from the error-handling design.
///
/// Every leaf error variant maps to exactly one kind; this is how
/// callers (retry policies, the workflow engine) decide whether to
/// retry, skip, or propagate fatally without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity absent upstream (HTTP 404, `success:false`).
    NotFound,
    /// Timeouts, 5xx — safe to retry.
    TransientUpstream,
    /// 4xx, malformed response — not retried.
    PermanentUpstream,
    /// Caller-invariant violated (e.g. mismatched list lengths).
    Precondition,
    /// Unparseable UTF-8 / period / industry code.
    InvalidInput,
    /// Cooperative abort via cancellation token.
    Cancelled,
    /// A bug; should be unreachable in correct operation.
    Internal,
}

/// Top-level error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Markdown chunking errors.
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Embedding service client errors.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector store adapter errors.
    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    /// Financial data service client errors.
    #[error("financial data error: {0}")]
    FinancialData(#[from] FinancialDataError),

    /// Workflow engine / report orchestration errors.
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Configuration loading/validation errors.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Invalid state errors not covered by a more specific variant.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state.
        message: String,
    },
}

impl Error {
    /// Returns the error kind driving retry/skip/propagate decisions.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Chunking(e) => e.kind(),
            Self::Embedding(e) => e.kind(),
            Self::VectorStore(e) => e.kind(),
            Self::FinancialData(e) => e.kind(),
            Self::Workflow(e) => e.kind(),
            Self::Config(_) | Self::Command(_) => ErrorKind::InvalidInput,
            Self::Io(_) | Self::InvalidState { .. } => ErrorKind::Internal,
        }
    }
}

/// Markdown chunking errors.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Invalid UTF-8 encountered at specific byte offset.
    #[error("invalid UTF-8 at byte offset {offset}")]
    InvalidUtf8 {
        /// Byte offset where invalid UTF-8 was found.
        offset: usize,
    },

    /// `max_chars`/`min_chars` configuration is inconsistent.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Regex compilation error (sentence/heading/table patterns).
    #[error("regex error: {0}")]
    Regex(String),
}

impl ChunkingError {
    /// Returns the error kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUtf8 { .. } => ErrorKind::InvalidInput,
            Self::InvalidConfig { .. } | Self::Regex(_) => ErrorKind::Internal,
        }
    }
}

/// Embedding service client errors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Network/timeout failure calling the embedding service.
    #[error("embedding service unreachable: {0}")]
    Transport(String),

    /// Non-2xx response from the embedding service.
    #[error("embedding service returned an error: {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body or message.
        message: String,
    },

    /// Retries exhausted against a transient failure.
    #[error("embedding service retries exhausted after {attempts} attempts: {reason}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last observed failure reason.
        reason: String,
    },

    /// The service returned a different vector count than requested.
    #[error("embedding protocol violation: requested {requested} texts, got {returned} vectors")]
    ProtocolViolation {
        /// Number of texts requested.
        requested: usize,
        /// Number of vectors returned.
        returned: usize,
    },

    /// Response body could not be decoded as JSON.
    #[error("failed to decode embedding response: {0}")]
    Decode(String),
}

impl EmbeddingError {
    /// Returns the error kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::TransientUpstream,
            Self::Upstream { .. } | Self::Decode(_) => ErrorKind::PermanentUpstream,
            Self::RetriesExhausted { .. } => ErrorKind::TransientUpstream,
            Self::ProtocolViolation { .. } => ErrorKind::Precondition,
        }
    }
}

/// Vector store adapter errors.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(String),

    /// Mismatched list lengths on `insert`.
    #[error("precondition violated: {reason}")]
    Precondition {
        /// Description of the violated invariant.
        reason: String,
    },

    /// HNSW index operation failed (feature-gated backend).
    #[error("vector index error: {0}")]
    Index(String),

    /// A requested collection/report was not found.
    #[error("report not found: {report_id}")]
    ReportNotFound {
        /// The report id that was not found.
        report_id: String,
    },

    /// Schema migration error.
    #[error("schema migration error: {0}")]
    Migration(String),
}

impl VectorStoreError {
    /// Returns the error kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) | Self::Index(_) | Self::Migration(_) => ErrorKind::Internal,
            Self::Precondition { .. } => ErrorKind::Precondition,
            Self::ReportNotFound { .. } => ErrorKind::NotFound,
        }
    }
}

/// Financial data service client errors.
#[derive(Error, Debug)]
pub enum FinancialDataError {
    /// Network/timeout failure calling the financial data service.
    #[error("financial data service unreachable: {0}")]
    Transport(String),

    /// The service reported `success:false` or HTTP 404.
    #[error("financial data not found for {stock_code} / {report_period}")]
    NotFound {
        /// Requested stock code.
        stock_code: String,
        /// Requested report period.
        report_period: String,
    },

    /// Non-2xx response other than a recognized not-found shape.
    #[error("financial data service returned an error: {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body or message.
        message: String,
    },

    /// Retries exhausted against a transient failure.
    #[error("financial data service retries exhausted after {attempts} attempts: {reason}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last observed failure reason.
        reason: String,
    },

    /// The report period could not be parsed/normalized.
    #[error("invalid report period: {0}")]
    InvalidPeriod(String),

    /// Response body could not be decoded as JSON.
    #[error("failed to decode financial data response: {0}")]
    Decode(String),
}

impl FinancialDataError {
    /// Returns the error kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::RetriesExhausted { .. } => ErrorKind::TransientUpstream,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Upstream { .. } | Self::Decode(_) => ErrorKind::PermanentUpstream,
            Self::InvalidPeriod(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Workflow engine / report orchestration errors.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// A node was asked to run with a missing dependency (engine bug).
    #[error("node {node} ran with missing prerequisite state")]
    MissingPrerequisite {
        /// Name of the node that could not proceed.
        node: String,
    },

    /// The industry code was not found in the registry.
    #[error("unknown industry: {code}")]
    UnknownIndustry {
        /// The industry code that was not recognized.
        code: String,
    },

    /// The run was cancelled cooperatively.
    #[error("run cancelled")]
    Cancelled,

    /// The LLM client returned a transport failure.
    #[error("LLM service unreachable: {0}")]
    LlmTransport(String),

    /// The LLM client returned a non-2xx response.
    #[error("LLM service returned an error: {status}: {message}")]
    LlmUpstream {
        /// HTTP status code.
        status: u16,
        /// Response body or message.
        message: String,
    },
}

impl WorkflowError {
    /// Returns the error kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPrerequisite { .. } => ErrorKind::Internal,
            Self::UnknownIndustry { .. } => ErrorKind::InvalidInput,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::LlmTransport(_) => ErrorKind::TransientUpstream,
            Self::LlmUpstream { .. } => ErrorKind::PermanentUpstream,
        }
    }
}

/// Configuration loading/validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration could not be loaded from any source.
    #[error("failed to load configuration: {0}")]
    Load(String),

    /// A required configuration value was missing or malformed.
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Reason the value is invalid.
        reason: String,
    },
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to create a directory.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

// Implement From traits for standard library / third-party errors.

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::VectorStore(VectorStoreError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for VectorStoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<regex::Error> for ChunkingError {
    fn from(err: regex::Error) -> Self {
        Self::Regex(err.to_string())
    }
}

impl From<serde_json::Error> for EmbeddingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for FinancialDataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for FinancialDataError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmTransport(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ChunkingError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::InvalidUtf8 {
            offset: err.utf8_error().valid_up_to(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidState {
            message: "test error".to_string(),
        };
        assert_eq!(err.to_string(), "invalid state: test error");
    }

    #[test]
    fn test_kind_mapping_embedding() {
        let err = EmbeddingError::Transport("timeout".to_string());
        assert_eq!(err.kind(), ErrorKind::TransientUpstream);

        let err = EmbeddingError::ProtocolViolation {
            requested: 3,
            returned: 2,
        };
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_kind_mapping_financial_data() {
        let err = FinancialDataError::NotFound {
            stock_code: "600000".to_string(),
            report_period: "2024-03-31".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = FinancialDataError::Upstream {
            status: 400,
            message: "bad request".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::PermanentUpstream);
    }

    #[test]
    fn test_kind_mapping_workflow() {
        assert_eq!(WorkflowError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            WorkflowError::UnknownIndustry {
                code: "xyz".to_string()
            }
            .kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_vector_store_error_display() {
        let err = VectorStoreError::Precondition {
            reason: "chunks.len() != vectors.len()".to_string(),
        };
        assert!(err.to_string().contains("precondition violated"));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_top_level_kind_delegates() {
        let err: Error = EmbeddingError::Transport("x".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::TransientUpstream);
    }

    #[test]
    fn test_from_rusqlite_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::VectorStore(VectorStoreError::Database(_))));
    }

    #[test]
    fn test_from_regex_error() {
        let regex_err = regex::Regex::new("[invalid").unwrap_err();
        let err: ChunkingError = regex_err.into();
        assert!(matches!(err, ChunkingError::Regex(_)));
    }

    #[test]
    fn test_command_error_display() {
        let err = CommandError::MissingArgument("--path".to_string());
        assert_eq!(err.to_string(), "missing required argument: --path");
    }
}
