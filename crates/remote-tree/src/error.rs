use thiserror::Error;

pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// Failure outcomes of tree and navigator operations
///
/// Every variant carries a human readable message. `NotFound` and
/// `RemoteUnavailable` are always distinct: a lookup that found nothing never
/// reports a transport failure and vice versa.
///
/// The type is `Clone` because a single discovery outcome is handed to every
/// caller waiting on the same in-flight listing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No matching id or name at the queried scope
    #[error("not found: {0}")]
    NotFound(String),
    /// Transport, auth or quota failure reported by the resource client
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),
    /// The operation does not apply to the target (programmer error)
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Remote state no longer matches what the cache was told
    #[error("conflict: {0}")]
    Conflict(String),
}

impl TreeError {
    pub fn not_found(what: impl Into<String>) -> Self {
        TreeError::NotFound(what.into())
    }

    pub fn remote(what: impl Into<String>) -> Self {
        TreeError::RemoteUnavailable(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        TreeError::InvalidOperation(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        TreeError::Conflict(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, TreeError::RemoteUnavailable(_))
    }
}

impl From<std::io::Error> for TreeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => TreeError::NotFound(err.to_string()),
            _ => TreeError::RemoteUnavailable(err.to_string()),
        }
    }
}
