use crate::token::TokenPurpose;
use jsonwebtoken::errors::Error as JwtError;
use socium_common::{
    model::{
        Id, ModelValidationError,
        account::{AccountMarker, EmailAddress},
        auth::PasswordHashError,
        contact::ContactMarker,
        post::PostMarker,
    },
    snowflake::SnowflakeTimestampError,
};
use socium_db::DbError;
use thiserror::Error;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// Coarse classification of a [`ServiceError`], used by the transport layer
/// to choose a status code.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    AlreadyActivated,
    Unauthorized,
    InvalidInput,
    PartialWrite,
    Persistence,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Account with id {0} was not found")]
    AccountNotFound(Id<AccountMarker>),
    #[error("No account is registered for {0}")]
    EmailNotFound(EmailAddress),
    #[error("Post with id {0} was not found")]
    PostNotFound(Id<PostMarker>),
    #[error("Contact message with id {0} was not found")]
    ContactNotFound(Id<ContactMarker>),
    #[error("Account {account} has no pending friend request from {requester}")]
    FriendRequestNotFound {
        account: Id<AccountMarker>,
        requester: Id<AccountMarker>,
    },
    #[error("An account is already registered for {0}")]
    AccountAlreadyRegistered(EmailAddress),
    #[error("Account {0} is already activated")]
    AccountAlreadyActivated(Id<AccountMarker>),
    #[error("Email or password did not match")]
    InvalidCredentials,
    #[error("Account {0} is not activated")]
    AccountNotActivated(Id<AccountMarker>),
    #[error("The access token was rejected: {0}")]
    InvalidToken(#[source] JwtError),
    #[error("Expected a {expected:?} token, got a {found:?} token")]
    WrongTokenPurpose {
        expected: TokenPurpose,
        found: TokenPurpose,
    },
    #[error("The token for account {0} was issued before its last change")]
    StaleToken(Id<AccountMarker>),
    #[error("Account {0} cannot befriend itself")]
    SelfFriendRequest(Id<AccountMarker>),
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ModelValidationError),
    #[error(
        "Writing account {counterpart} failed after account {account} was written \
        (rolled back: {rolled_back}): {source}"
    )]
    PartialWrite {
        account: Id<AccountMarker>,
        counterpart: Id<AccountMarker>,
        rolled_back: bool,
        #[source]
        source: DbError,
    },
    #[error(transparent)]
    Db(DbError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("Could not allocate an id: {0}")]
    Snowflake(#[from] SnowflakeTimestampError),
    #[error("Signing the access token failed: {0}")]
    TokenSigning(#[source] JwtError),
}

/// A lost registration race surfaces as a taken email in the store.
impl From<DbError> for ServiceError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::EmailTaken(email) => ServiceError::AccountAlreadyRegistered(email),
            other => ServiceError::Db(other),
        }
    }
}

impl ServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::AccountNotFound(_)
            | ServiceError::EmailNotFound(_)
            | ServiceError::PostNotFound(_)
            | ServiceError::ContactNotFound(_)
            | ServiceError::FriendRequestNotFound { .. } => ErrorKind::NotFound,
            ServiceError::AccountAlreadyRegistered(_) => ErrorKind::AlreadyExists,
            ServiceError::AccountAlreadyActivated(_) => ErrorKind::AlreadyActivated,
            ServiceError::InvalidCredentials
            | ServiceError::AccountNotActivated(_)
            | ServiceError::InvalidToken(_)
            | ServiceError::WrongTokenPurpose { .. }
            | ServiceError::StaleToken(_) => ErrorKind::Unauthorized,
            ServiceError::SelfFriendRequest(_) | ServiceError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            ServiceError::PartialWrite { .. } => ErrorKind::PartialWrite,
            ServiceError::Db(_) => ErrorKind::Persistence,
            ServiceError::PasswordHash(_)
            | ServiceError::Snowflake(_)
            | ServiceError::TokenSigning(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ErrorKind, ServiceError};
    use socium_common::model::account::EmailAddress;
    use socium_db::DbError;

    #[test]
    fn taken_email_is_a_duplicate_registration() {
        let email = EmailAddress::new("ada@example.com").unwrap();

        let error = ServiceError::from(DbError::EmailTaken(email.clone()));
        assert!(matches!(&error, ServiceError::AccountAlreadyRegistered(taken) if *taken == email));
        assert_eq!(error.kind(), ErrorKind::AlreadyExists);

        let refused = ServiceError::from(DbError::WriteRefused(1));
        assert_eq!(refused.kind(), ErrorKind::Persistence);
    }
}
