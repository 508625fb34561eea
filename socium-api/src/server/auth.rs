use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use socium_common::model::{
    Id,
    account::{AccountMarker, Role},
};
use socium_service::token::TokenKeys;
use std::sync::Arc;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The caller, as vouched for by a valid bearer token.
///
/// The role is the one the account had when the token was issued.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct AuthenticatedAccount {
    id: Id<AccountMarker>,
    role: Role,
}

impl AuthenticatedAccount {
    #[must_use]
    pub fn account_id(self) -> Id<AccountMarker> {
        self.id
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        self.role == Role::Admin
    }

    /// Only the account itself and admins may change an account.
    pub fn ensure_may_act_on(self, target: Id<AccountMarker>) -> Result<(), ServerError> {
        if self.id == target || self.is_admin() {
            Ok(())
        } else {
            Err(ServerError::ForeignAccount {
                caller: self.id,
                target,
            })
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedAccount
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let claims = Arc::<TokenKeys>::from_ref(state).verify(header.token())?;

        Ok(Self {
            id: claims.sub,
            role: claims.role,
        })
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct AdminAccount(AuthenticatedAccount);

impl AdminAccount {
    #[must_use]
    pub fn account_id(self) -> Id<AccountMarker> {
        self.0.account_id()
    }
}

impl<S> FromRequestParts<S> for AdminAccount
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let account = AuthenticatedAccount::from_request_parts(parts, state).await?;

        if account.is_admin() {
            Ok(Self(account))
        } else {
            Err(ServerError::AdminRequired(account.account_id()))
        }
    }
}
