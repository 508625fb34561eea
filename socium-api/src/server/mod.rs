use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use extract::Json;
use serde::{Deserialize, Serialize};
use socium_common::model::{Id, account::AccountMarker};
use socium_db::Gateway;
use socium_service::{ErrorKind, Service, ServiceError, token::TokenKeys};
use std::{num::ParseIntError, sync::Arc};
use thiserror::Error;
use tracing::error;

mod auth;
mod extract;
mod routes;

pub use auth::{AdminAccount, AuthenticatedAccount};

pub type ServerRouter<G> = Router<ServerState<G>>;

pub struct ServerState<G> {
    pub service: Arc<Service<G>>,
    pub tokens: Arc<TokenKeys>,
}

impl<G: Gateway> ServerState<G> {
    #[must_use]
    pub fn new(service: Arc<Service<G>>) -> Self {
        let tokens = Arc::clone(service.tokens());
        Self { service, tokens }
    }
}

impl<G> Clone for ServerState<G> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<G> FromRef<ServerState<G>> for Arc<Service<G>> {
    fn from_ref(input: &ServerState<G>) -> Self {
        Arc::clone(&input.service)
    }
}

impl<G> FromRef<ServerState<G>> for Arc<TokenKeys> {
    fn from_ref(input: &ServerState<G>) -> Self {
        Arc::clone(&input.tokens)
    }
}

pub fn routes<G: Gateway>() -> ServerRouter<G> {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("Id list could not be parsed: {0}")]
    InvalidIdList(ParseIntError),
    #[error("Account {0} is not an admin")]
    AdminRequired(Id<AccountMarker>),
    #[error("Account {caller} may not act on behalf of account {target}")]
    ForeignAccount {
        caller: Id<AccountMarker>,
        target: Id<AccountMarker>,
    },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidIdList(_) => StatusCode::BAD_REQUEST,
            ServerError::AdminRequired(_) | ServerError::ForeignAccount { .. } => {
                StatusCode::FORBIDDEN
            }
            ServerError::JsonResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Service(error) => match error.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::AlreadyExists | ErrorKind::AlreadyActivated => StatusCode::CONFLICT,
                ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::PartialWrite | ErrorKind::Persistence | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
