use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Json(serde_json::Error),
    Api { status: u16, message: String },
    Auth(String),
    RefreshFailed { read: &'static str, source: Box<Error> },
    CommandFailed { action: &'static str, source: Box<Error> },
    UnknownEntity(String),
    UnknownZone(String),
    InvalidValue { what: &'static str, value: String },
    Config(String),
}

impl Error {
    /// True for the errors a write raises before touching the network.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownEntity(_) | Error::UnknownZone(_) | Error::InvalidValue { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Json(e) => write!(f, "malformed response: {e}"),
            Error::Api { status, message } => write!(f, "API error {status}: {message}"),
            Error::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Error::RefreshFailed { read, source } => {
                write!(f, "error fetching data ({read}): {source}")
            }
            Error::CommandFailed { action, source } => write!(f, "{action} failed: {source}"),
            Error::UnknownEntity(id) => write!(f, "unknown entity: {id}"),
            Error::UnknownZone(id) => write!(f, "unknown zone: {id}"),
            Error::InvalidValue { what, value } => write!(f, "invalid {what}: {value}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::RefreshFailed { source, .. } | Error::CommandFailed { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
