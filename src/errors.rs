use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for repository operations.
///
/// Each kind describes a category of failure by its origin: descriptor
/// resolution, identity handling, object mapping, or the underlying driver.
/// Absence of a matching document is never an error; point lookups return
/// `Option<T>` instead.
///
/// # Examples
///
/// ```rust,ignore
/// use mongo_repository::errors::{RepoError, ErrorKind, RepoResult};
///
/// fn example() -> RepoResult<()> {
///     Err(RepoError::new("Connection string has no database name", ErrorKind::MissingDatabaseName))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Resolution errors - raised synchronously at construction
    /// The connection descriptor could not be parsed
    InvalidConnectionString,
    /// The connection descriptor carries no default database name
    MissingDatabaseName,

    // Identity errors - raised during key resolution
    /// The supplied identifier cannot be resolved to a filter value
    InvalidId,
    /// The entity carries no identifier value
    NotIdentifiable,

    // Mapping errors - raised during entity serialization/deserialization
    /// Error mapping an entity to/from its document representation
    ObjectMappingError,

    // Driver errors - propagated unchanged from the MongoDB driver
    /// Transport or server-side error surfaced by the driver
    DriverError,

    // Operation errors
    /// The operation is not supported by this repository
    UnsupportedOperation,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidConnectionString => write!(f, "Invalid connection string"),
            ErrorKind::MissingDatabaseName => write!(f, "Missing database name"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::NotIdentifiable => write!(f, "Not identifiable"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::DriverError => write!(f, "Driver error"),
            ErrorKind::UnsupportedOperation => write!(f, "Unsupported operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom repository error type.
///
/// `RepoError` encapsulates the error message, kind, and optional cause. Driver
/// errors are carried as the cause so callers can reason directly about the
/// driver's failure modes; no translation is performed beyond categorization.
///
/// # Examples
///
/// ```rust,ignore
/// use mongo_repository::errors::{RepoError, ErrorKind};
///
/// let err = RepoError::new("Entity has no id value", ErrorKind::NotIdentifiable);
/// ```
///
/// # Type alias
///
/// The `RepoResult<T>` type alias is equivalent to `Result<T, RepoError>` and is
/// used throughout the crate for operations that can fail.
#[derive(Clone)]
pub struct RepoError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Arc<dyn Error + Send + Sync>>,
    backtrace: Arc<Backtrace>,
}

impl RepoError {
    /// Creates a new `RepoError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `RepoError` with an underlying cause.
    ///
    /// The cause is preserved as the error source, so the original driver or
    /// serialization failure stays reachable through `Error::source`.
    pub fn new_with_cause(
        message: &str,
        error_kind: ErrorKind,
        cause: impl Error + Send + Sync + 'static,
    ) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind,
            cause: Some(Arc::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync)> {
        self.cause.as_deref()
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref() as &(dyn Error + 'static)),
            None => None,
        }
    }
}

/// A result type alias for repository operations.
///
/// `RepoResult<T>` is shorthand for `Result<T, RepoError>`.
pub type RepoResult<T> = Result<T, RepoError>;

// From trait implementations for the boundary error types
impl From<mongodb::error::Error> for RepoError {
    fn from(err: mongodb::error::Error) -> Self {
        RepoError::new_with_cause(&format!("Driver error: {}", err), ErrorKind::DriverError, err)
    }
}

impl From<mongodb::bson::ser::Error> for RepoError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        RepoError::new_with_cause(
            &format!("Entity serialization error: {}", err),
            ErrorKind::ObjectMappingError,
            err,
        )
    }
}

impl From<mongodb::bson::de::Error> for RepoError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        RepoError::new_with_cause(
            &format!("Entity deserialization error: {}", err),
            ErrorKind::ObjectMappingError,
            err,
        )
    }
}

impl From<mongodb::bson::oid::Error> for RepoError {
    fn from(err: mongodb::bson::oid::Error) -> Self {
        RepoError::new_with_cause(
            &format!("Object id error: {}", err),
            ErrorKind::InvalidId,
            err,
        )
    }
}
