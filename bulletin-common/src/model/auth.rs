use crate::{
    model::{
        Id,
        user::{User, UserMarker},
    },
    object_id::ObjectIdParseError,
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

pub const PASSWORD_MIN_LEN: usize = 5;
pub const PASSWORD_SALT_LEN: usize = 16;
pub const TOKEN_LIFETIME: Duration = Duration::hours(1);

/// Who is making a request. Resolved once per request and handed to every
/// operation explicitly.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated {
        id: Id<UserMarker>,
        email: String,
    },
}

impl Identity {
    #[must_use]
    pub fn user_id(&self) -> Option<Id<UserMarker>> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated { id, .. } => Some(*id),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token could not be signed or verified: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Token subject is not a valid user id: {0}")]
    InvalidSubject(#[from] ObjectIdParseError),
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            lifetime,
        }
    }

    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        Self::new(secret.as_bytes(), TOKEN_LIFETIME)
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, user: &User, issued_at: OffsetDateTime) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: user.id.to_string(),
            email: user.email.get().to_owned(),
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + self.lifetime).unix_timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Turns a bearer token into an identity. Any failure yields
    /// [`Identity::Anonymous`].
    #[must_use]
    pub fn resolve(&self, token: &str) -> Identity {
        let resolved = self.verify(token).and_then(|claims| {
            Ok(Identity::Authenticated {
                id: claims.user_id.parse()?,
                email: claims.email,
            })
        });

        resolved.unwrap_or_else(|err| {
            debug!(error = %err, "Treating request with rejected token as anonymous");
            Identity::Anonymous
        })
    }
}

impl Debug for TokenKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("secret", &"[redacted]")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(argon2::password_hash::Error);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The stored password digest is not a valid PHC string")]
pub struct InvalidPasswordDigestError;

/// An argon2 digest in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn hash(password: &str) -> Result<Self, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let digest = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(digest.to_string()))
    }

    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        PasswordHash::new(&self.0).is_ok_and(|digest| {
            Argon2::default()
                .verify_password(password.as_bytes(), &digest)
                .is_ok()
        })
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PasswordDigest {
    type Error = InvalidPasswordDigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PasswordHash::new(&value).map_err(|_| InvalidPasswordDigestError)?;
        Ok(Self(value))
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}
