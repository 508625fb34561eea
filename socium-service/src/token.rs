use crate::error::{Result, ServiceError};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use socium_common::{
    model::{
        Id,
        account::{Account, AccountMarker, Role},
        auth::AccessToken,
    },
    util::PositiveDuration,
};
use std::fmt::{Debug, Formatter};
use time::{Duration, OffsetDateTime};

/// What a token may be used for. Tokens of one purpose are rejected
/// everywhere else.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Bearer token handed out on login.
    Access,
    /// Mailed on registration.
    Activation,
    /// Mailed by the forgot-password flow.
    PasswordReset,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Id<AccountMarker>,
    pub role: Role,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
}

pub const ACTIVATION_LIFETIME: Duration = Duration::days(7);
pub const PASSWORD_RESET_LIFETIME: Duration = Duration::hours(1);

/// HS256 signing and verification of access tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: PositiveDuration,
}

impl TokenKeys {
    #[must_use]
    pub fn from_secret(secret: &[u8], lifetime: PositiveDuration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime,
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> PositiveDuration {
        self.lifetime
    }

    /// Signs an access token.
    pub fn sign(&self, account: &Account) -> Result<AccessToken> {
        self.sign_for(account, TokenPurpose::Access)
    }

    pub fn sign_for(&self, account: &Account, purpose: TokenPurpose) -> Result<AccessToken> {
        self.sign_at(account, purpose, OffsetDateTime::now_utc())
    }

    pub fn sign_at(
        &self,
        account: &Account,
        purpose: TokenPurpose,
        issued_at: OffsetDateTime,
    ) -> Result<AccessToken> {
        let lifetime = match purpose {
            TokenPurpose::Access => self.lifetime.get(),
            TokenPurpose::Activation => ACTIVATION_LIFETIME,
            TokenPurpose::PasswordReset => PASSWORD_RESET_LIFETIME,
        };

        let claims = Claims {
            sub: account.id,
            role: account.role,
            purpose,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + lifetime).unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map(AccessToken::new)
            .map_err(ServiceError::TokenSigning)
    }

    /// Checks signature and expiry of an access token.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_for(token, TokenPurpose::Access)
    }

    /// Checks signature, expiry and purpose.
    pub fn verify_for(&self, token: &str, purpose: TokenPurpose) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(ServiceError::InvalidToken)?;

        if claims.purpose == purpose {
            Ok(claims)
        } else {
            Err(ServiceError::WrongTokenPurpose {
                expected: purpose,
                found: claims.purpose,
            })
        }
    }
}

impl Debug for TokenKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
