use thiserror::Error;

/// Failure classes surfaced to the session state controller.
///
/// Variants carry the normalized backend detail as a string so the whole enum
/// stays `Clone` and can live inside the session state as `last_error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("could not fetch current user: {0}")]
    ProfileFetchFailed(String),
    #[error("credential renewal failed: {0}")]
    RenewalFailed(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// Error class, used to clear a stored error only when the next successful
/// operation is of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Login,
    Profile,
    Renewal,
    Request,
}

impl SessionError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::LoginRejected(_) => ErrorKind::Login,
            Self::ProfileFetchFailed(_) => ErrorKind::Profile,
            Self::RenewalFailed(_) => ErrorKind::Renewal,
            Self::Request(_) => ErrorKind::Request,
        }
    }
}
