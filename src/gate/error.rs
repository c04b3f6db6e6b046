use thiserror::Error;

/// Failures surfaced by the gate. Display strings are safe to show to visitors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("configuration missing")]
    ConfigurationMissing,
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("invalid token")]
    InvalidToken,
    #[error("malformed request")]
    MalformedRequest,
    #[error("settings store unavailable")]
    Store(String),
}

impl GateError {
    /// Message for JSON responses; never carries store internals.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::IncorrectPassword => "Incorrect password.",
            Self::InvalidToken => "Access denied.",
            Self::MalformedRequest => "Malformed request.",
            Self::ConfigurationMissing | Self::Store(_) => "Service unavailable.",
        }
    }
}

impl From<anyhow::Error> for GateError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(format!("{err:#}"))
    }
}
