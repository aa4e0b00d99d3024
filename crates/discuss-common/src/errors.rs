use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Errors raised while encoding or decoding STOMP frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StompError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown stomp command: {0}")]
    UnknownCommand(String),

    #[error("header block is not terminated by a blank line")]
    UnterminatedHeaders,

    #[error("malformed header line: {0}")]
    MalformedHeader(String),

    #[error("invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    #[error("frame is missing its NUL terminator")]
    MissingTerminator,

    #[error("content-length {declared} exceeds body size {actual}")]
    ContentLength { declared: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no credential available")]
    MissingCredential,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection timed out after {0}s")]
    Timeout(u64),

    #[error("handshake rejected: {0}")]
    Rejected(String),

    #[error("socket closed")]
    Closed,

    #[error(transparent)]
    Frame(#[from] StompError),
}

/// Top-level error for callers that drive a whole sync session.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
