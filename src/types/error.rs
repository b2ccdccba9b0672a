use thiserror::Error;

/// herdbook error types
#[derive(Error, Debug)]
pub enum HerdbookError {
    /// Transport failure or undecodable response body
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("server error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse JSON or a user-supplied value
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// User context store failed
    #[error("context error: {0}")]
    Context(String),

    /// Capability check refused the action
    #[error("not allowed: {0}")]
    Forbidden(String),

    /// Client-side input validation failed
    #[error("invalid input: {0}")]
    Validation(String),
}

impl HerdbookError {
    /// True when the failure was reported by the server rather than the transport
    pub fn is_server_reported(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Message suitable for a user-facing notice
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Network(_) => "Could not reach the farm server. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for HerdbookError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias for herdbook
pub type Result<T> = std::result::Result<T, HerdbookError>;
