use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureReason {
    /// The request never completed (connection refused, timeout, cancelled).
    Network,
    /// The remote system rejected the credentials.
    InvalidCredentials,
    /// A protected call came back unauthorized.
    SessionExpired,
    /// A newer login or logout happened while this request was in flight.
    Superseded,
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailureReason::Network => write!(f, "network failure"),
            AuthFailureReason::InvalidCredentials => write!(f, "invalid credentials"),
            AuthFailureReason::SessionExpired => write!(f, "session expired"),
            AuthFailureReason::Superseded => write!(f, "superseded by a newer request"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("authentication failed ({reason}): {message}")]
pub struct AuthError {
    pub reason: AuthFailureReason,
    pub message: String,
}

impl AuthError {
    pub fn new(reason: AuthFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// The repository refused or failed to create a workspace item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("create failed in collection {collection_id}: {message}")]
pub struct CreateError {
    pub collection_id: String,
    pub message: String,
}

/// Problems detected before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a title is required")]
    MissingTitle,
    #[error("at least one file is required for the local target")]
    MissingFile,
    #[error("a collection is required for the repository target")]
    MissingCollection,
    #[error("no upload target selected")]
    NoTargets,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("not a valid email address")]
    InvalidEmail,
    #[error("passwords don't match")]
    PasswordMismatch,
}
