use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing the password failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

/// A plain text password as received from a client.
#[derive(Clone, Eq, PartialEq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Argon2 PHC string of a password.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn hash(password: &Password) -> Result<Self, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let hash = Argon2::default()
            .hash_password(password.expose().as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Stored hashes that do not parse never verify.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.expose().as_bytes(), &parsed)
                .is_ok()
        })
    }

    #[must_use]
    pub fn from_phc_string(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_phc_str(&self) -> &str {
        &self.0
    }
}

/// A signed bearer token handed out on login.
#[derive(Clone, Eq, PartialEq, Hash, Serialize)]
pub struct AccessToken {
    token: String,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self { token }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl Debug for HashedPassword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HashedPassword").field(&"[redacted]").finish()
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[redacted]")
            .finish()
    }
}
