//! Crate-wide error handling.
//!
//! Internally everything is an `anyhow::Error`. When an error leaves a command handler it is tagged
//! with an `ErrorType` so that the binary (or any other caller) can tell a configuration problem
//! from a rejected request without parsing the message.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The public category of an error returned from a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The home directory, config file or credentials are missing or invalid.
    Config,
    /// A journal entry failed client-side checks; nothing was sent.
    Validation,
    /// The backend could not be reached or did not accept the request.
    Request,
    /// Reading or writing local files (drafts, backups, exports) failed.
    Storage,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// An error carrying its public `ErrorType`.
pub struct PubError {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl PubError {
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// The underlying error, which can be downcast to e.g. `ApiError` or `ValidationError`.
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl Debug for PubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PubError({}, {:?})", self.error_type, self.inner)
    }
}

impl Display for PubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.inner)
    }
}

impl std::error::Error for PubError {}

/// Tags the error side of a result with an `ErrorType`.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let inner: anyhow::Error = e.into();
            // Keep the innermost tag if the error was already categorized further down.
            if inner.downcast_ref::<PubError>().is_some() {
                inner
            } else {
                anyhow::Error::new(PubError { error_type, inner })
            }
        })
    }
}

/// Returns the `ErrorType` of `e` if it was tagged with one.
pub fn error_type(e: &Error) -> Option<ErrorType> {
    e.downcast_ref::<PubError>().map(PubError::error_type)
}
