//! Error type shared by collaborators, transports and the activity log

#[derive(Debug)]
pub enum AggregationError {
    /// Resource or user lookup failed or is unavailable
    Lookup(String),
    /// Outbound delivery rejected by the feed service
    Transport(String),
    Http(reqwest::Error),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for AggregationError {
    fn from(err: std::io::Error) -> Self {
        AggregationError::Io(err)
    }
}

impl From<serde_json::Error> for AggregationError {
    fn from(err: serde_json::Error) -> Self {
        AggregationError::Serialization(err)
    }
}

impl From<reqwest::Error> for AggregationError {
    fn from(err: reqwest::Error) -> Self {
        AggregationError::Http(err)
    }
}

impl std::fmt::Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::Lookup(e) => write!(f, "Lookup error: {}", e),
            AggregationError::Transport(e) => write!(f, "Transport error: {}", e),
            AggregationError::Http(e) => write!(f, "HTTP error: {}", e),
            AggregationError::Io(e) => write!(f, "IO error: {}", e),
            AggregationError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for AggregationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AggregationError::Http(e) => Some(e),
            AggregationError::Io(e) => Some(e),
            AggregationError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregationError>;
