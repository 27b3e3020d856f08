use bulletin_common::model::auth::{PasswordHashError, TokenError};
use bulletin_db::store::DbError;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;

/// Status used when an error carries no code of its own.
pub const DEFAULT_STATUS: u16 = 500;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ValidationMessage {
    pub message: &'static str,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input.")]
    Validation(Vec<ValidationMessage>),
    #[error("Not authenticated!")]
    NotAuthenticated,
    #[error("User not found.")]
    UnknownEmail,
    #[error("Invalid Password")]
    WrongPassword,
    #[error("Invalid user.")]
    InvalidUser,
    #[error("Not authorized!")]
    Forbidden,
    #[error("No post found!")]
    PostNotFound,
    #[error("User exists already!")]
    UserExists,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Blocking task failed: {0}")]
    Join(#[from] JoinError),
}

impl ServiceError {
    /// The explicit code of this error, if it has one.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            ServiceError::Validation(_) => Some(422),
            ServiceError::NotAuthenticated
            | ServiceError::UnknownEmail
            | ServiceError::WrongPassword
            | ServiceError::InvalidUser => Some(401),
            ServiceError::Forbidden => Some(403),
            ServiceError::PostNotFound => Some(404),
            ServiceError::UserExists
            | ServiceError::Database(_)
            | ServiceError::PasswordHash(_)
            | ServiceError::Token(_)
            | ServiceError::Join(_) => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.code().unwrap_or(DEFAULT_STATUS)
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ServiceError::Database(_)
                | ServiceError::PasswordHash(_)
                | ServiceError::Token(_)
                | ServiceError::Join(_)
        )
    }

    /// The message shown to clients. Internal failures are not described.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.is_internal() {
            "An error occurred".to_owned()
        } else {
            self.to_string()
        }
    }

    #[must_use]
    pub fn details(&self) -> &[ValidationMessage] {
        match self {
            ServiceError::Validation(details) => details,
            _ => &[],
        }
    }
}
