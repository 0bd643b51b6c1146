use thiserror::Error;

/// Custom Error and Result types to unify errors from all sources.
pub type LbResult<T> = Result<T, LbError>;

#[derive(Error, Debug, Clone)]
pub enum LbError {
    /// Non-success HTTP status, network failure or timeout. Never retried internally.
    #[error("Upstream Error: {0}")]
    Upstream(String),

    /// The player detail payload could not be parsed, even after repair.
    #[error("Malformed Response: {reason}")]
    MalformedResponse {
        raw: String,
        repaired: String,
        reason: String,
    },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Render Error: {0}")]
    Render(String),
}

impl LbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LbError::NotFound(_))
    }
}

impl From<reqwest::Error> for LbError {
    fn from(error: reqwest::Error) -> Self {
        match error.is_timeout() {
            true => LbError::Upstream(format!("request timed out. {error}")),
            false => LbError::Upstream(error.to_string()),
        }
    }
}

impl From<figment::Error> for LbError {
    fn from(error: figment::Error) -> Self {
        LbError::Config(error.to_string())
    }
}

impl From<minijinja::Error> for LbError {
    fn from(error: minijinja::Error) -> Self {
        LbError::Render(error.to_string())
    }
}
