use std::path::PathBuf;

/// Result type alias for the crate's typed errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by document generation.
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    RouteDiscovery(RouteDiscoveryError),
    SerializationError(String),
}

/// Typed failure produced while reading routes out of a router, identifying
/// which phase ("inspect" or "discover") rejected the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDiscoveryError {
    pub operation: String,
    pub message: String,
}

impl RouteDiscoveryError {
    pub fn new(operation: &str, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RouteDiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "route {} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for RouteDiscoveryError {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "io error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "parse error {}: {}", file.display(), message)
            }
            Error::RouteDiscovery(e) => write!(f, "{}", e),
            Error::SerializationError(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::RouteDiscovery(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<RouteDiscoveryError> for Error {
    fn from(err: RouteDiscoveryError) -> Self {
        Error::RouteDiscovery(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("json: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("yaml: {}", err))
    }
}
