//! Unified error type for the ring buffer.
//!
//! All crates funnel their failures into [`Error`]. Query-time outcomes that
//! simply have no answer ([`Error::NoSegments`], [`Error::NoMatch`]) are kept
//! apart from real faults so callers can tell "nothing buffered yet" from
//! "something broke"; see [`Error::is_no_result`].

/// Unified error type covering all failure modes of the buffer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The index holds no segments at all.
    #[error("no segments available")]
    NoSegments,

    /// The index has segments but none satisfy the request.
    #[error("no segments match criteria: {0}")]
    NoMatch(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with the current buffer state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration is unusable; reported before the buffer starts.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NoSegments => 404,
            Error::NoMatch(_) => 404,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::Config(_) => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Internal(_) => 500,
        }
    }

    /// Whether this is an unsatisfiable query rather than a system fault.
    pub fn is_no_result(&self) -> bool {
        matches!(self, Error::NoSegments | Error::NoMatch(_))
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::NoMatch`].
    pub fn no_match(reason: impl Into<String>) -> Self {
        Error::NoMatch(reason.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
