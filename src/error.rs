use std::error::Error;
use std::fmt;
use tokio_cron_scheduler::JobSchedulerError;

/// Custom Error and Result types to unify errors from all sources.
pub type BoardResult<T> = Result<T, BoardError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    // Connection, timeout or protocol failure talking to the store.
    StoreUnavailable(String),
    // The store refused the command (authentication, read-only replica, ...).
    StoreRejected(String),
    // The store answered with something that is not a valid entry.
    CorruptData(String),
    MalformedInput(String),
    Config(String),
    Scheduler(String),
    Template(String),
    Io(String),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoardError::StoreUnavailable(s) => write!(f, "Store Unavailable: {}", s),
            BoardError::StoreRejected(s) => write!(f, "Store Rejected: {}", s),
            BoardError::CorruptData(s) => write!(f, "Corrupt Data: {}", s),
            BoardError::MalformedInput(s) => write!(f, "Malformed Input: {}", s),
            BoardError::Config(s) => write!(f, "Config Error: {}", s),
            BoardError::Scheduler(s) => write!(f, "Scheduler Error: {}", s),
            BoardError::Template(s) => write!(f, "Template Error: {}", s),
            BoardError::Io(s) => write!(f, "IO Error: {}", s),
        }
    }
}

impl Error for BoardError {}

impl BoardError {
    /// Whether retrying the same store call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BoardError::StoreUnavailable(_))
    }
}

impl From<redis::RedisError> for BoardError {
    fn from(error: redis::RedisError) -> Self {
        use redis::ErrorKind;
        match error.kind() {
            // Reply had an unexpected shape (e.g. a non integer hash field).
            ErrorKind::TypeError => BoardError::CorruptData(error.to_string()),
            ErrorKind::ExtensionError if error.code() == Some("WRONGTYPE") => {
                BoardError::CorruptData(error.to_string())
            }
            // Any other error reply: sending the command again gets the same answer.
            ErrorKind::ResponseError
            | ErrorKind::ExtensionError
            | ErrorKind::AuthenticationFailed
            | ErrorKind::ReadOnly
            | ErrorKind::NoScriptError
            | ErrorKind::ExecAbortError => BoardError::StoreRejected(error.to_string()),
            _ => BoardError::StoreUnavailable(error.to_string()),
        }
    }
}

impl From<JobSchedulerError> for BoardError {
    fn from(error: JobSchedulerError) -> Self {
        BoardError::Scheduler(error.to_string())
    }
}

impl From<figment::Error> for BoardError {
    fn from(error: figment::Error) -> Self {
        BoardError::Config(error.to_string())
    }
}

impl From<minijinja::Error> for BoardError {
    fn from(error: minijinja::Error) -> Self {
        BoardError::Template(error.to_string())
    }
}

impl From<std::io::Error> for BoardError {
    fn from(error: std::io::Error) -> Self {
        BoardError::Io(error.to_string())
    }
}
