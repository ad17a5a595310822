use thiserror::Error;

/// Errors surfaced by address parsing and channel operations.
///
/// Parsing errors are synchronous; channel-operation errors travel as the
/// failure case of the returned future. The crate performs no retries,
/// since retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("invalid address format: {0}")]
    InvalidAddressFormat(String),

    #[error("channel closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Opaque transport failure, propagated from the backend unchanged.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

impl ChannelError {
    /// Get the kind/category of this error.
    pub fn kind(&self) -> ChannelErrorKind {
        match self {
            ChannelError::InvalidAddressFormat(_) => ChannelErrorKind::InvalidAddressFormat,
            ChannelError::Closed => ChannelErrorKind::Closed,
            ChannelError::Io(_) => ChannelErrorKind::Io,
            ChannelError::Other(_) => ChannelErrorKind::Other,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelError::Closed)
    }
}

/// Lightweight error category for pattern matching without borrowing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelErrorKind {
    InvalidAddressFormat,
    Closed,
    Io,
    Other,
}

impl ChannelErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelErrorKind::InvalidAddressFormat => "BAD_ADDRESS",
            ChannelErrorKind::Closed => "CLOSED",
            ChannelErrorKind::Io => "IO",
            ChannelErrorKind::Other => "OTHER",
        }
    }
}

impl From<ChannelError> for std::io::Error {
    fn from(e: ChannelError) -> Self {
        std::io::Error::other(e.to_string())
    }
}
