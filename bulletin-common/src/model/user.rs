use crate::model::{Id, auth::PasswordDigest, post::PostMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use validator::ValidateEmail;

pub const DEFAULT_STATUS: &str = "I am new!";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// The publicly visible part of a user. The password digest lives in
/// [`UserCredentials`] and never in here.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub email: Email,
    pub name: String,
    pub status: String,
    pub posts: Vec<Id<PostMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub email: Email,
    pub name: String,
    pub password: PasswordDigest,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UserCredentials {
    pub user: User,
    pub password: PasswordDigest,
}

/// A well formed, trimmed and lowercased e-mail address.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The e-mail address is invalid: {0}")]
pub struct InvalidEmailError(String);

impl Email {
    pub fn new(email: &str) -> Result<Self, InvalidEmailError> {
        let normalized = email.trim().to_lowercase();
        if normalized.validate_email() {
            Ok(Self(normalized))
        } else {
            Err(InvalidEmailError(email.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(&inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

impl User {
    /// Removes every occurrence of `post_id` from the owned posts.
    /// Returns whether anything was removed.
    pub fn unlink_post(&mut self, post_id: Id<PostMarker>) -> bool {
        let before = self.posts.len();
        self.posts.retain(|owned| *owned != post_id);
        self.posts.len() != before
    }
}
