use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedAccount,
    extract::{Json, Query},
    routes::search_tokens,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socium_common::{
    geo::Coordinates,
    model::{
        Id,
        account::{Account, AccountMarker, CreateAccount, Credentials, EmailAddress, UpdateProfile},
        auth::{AccessToken, Password},
    },
};
use socium_db::Gateway;
use socium_service::{Service, directory::NEARBY_RADIUS_KM};
use std::sync::Arc;

pub fn routes<G: Gateway>() -> ServerRouter<G> {
    ServerRouter::new()
        .typed_post(register::<G>)
        .typed_post(login::<G>)
        .typed_get(activate::<G>)
        .typed_post(forgot_password::<G>)
        .typed_patch(reset_password::<G>)
        .typed_get(get_account::<G>)
        .typed_get(search_accounts::<G>)
        .typed_patch(update_profile::<G>)
        .typed_post(nearby_accounts::<G>)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/register", rejection(ServerError))]
struct RegisterPath();

async fn register<G: Gateway>(
    RegisterPath(): RegisterPath,
    State(service): State<Arc<Service<G>>>,
    Json(create): Json<CreateAccount>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = service.register(create).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/login", rejection(ServerError))]
struct LoginPath();

async fn login<G: Gateway>(
    LoginPath(): LoginPath,
    State(service): State<Arc<Service<G>>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AccessToken>> {
    let token = service.login(&credentials).await?;

    Ok(Json(token))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/activation/{token}", rejection(ServerError))]
struct ActivationPath {
    token: String,
}

async fn activate<G: Gateway>(
    ActivationPath { token }: ActivationPath,
    State(service): State<Arc<Service<G>>>,
) -> Result<Json<Account>> {
    let account = service.activate(&token).await?;

    Ok(Json(account))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/forgot-password", rejection(ServerError))]
struct ForgotPasswordPath();

#[derive(Deserialize)]
struct ForgotPasswordBody {
    email: EmailAddress,
}

async fn forgot_password<G: Gateway>(
    ForgotPasswordPath(): ForgotPasswordPath,
    State(service): State<Arc<Service<G>>>,
    Json(ForgotPasswordBody { email }): Json<ForgotPasswordBody>,
) -> Result<StatusCode> {
    service.forgot_password(&email).await?;

    Ok(StatusCode::ACCEPTED)
}

#[derive(TypedPath, Deserialize)]
/// `token` comes from the link mailed by the forgot-password flow.
#[typed_path("/api/reset-password/{token}", rejection(ServerError))]
struct ResetPasswordPath {
    token: String,
}

#[derive(Deserialize)]
struct ResetPasswordBody {
    password: Password,
}

async fn reset_password<G: Gateway>(
    ResetPasswordPath { token }: ResetPasswordPath,
    State(service): State<Arc<Service<G>>>,
    Json(ResetPasswordBody { password }): Json<ResetPasswordBody>,
) -> Result<Json<Account>> {
    let account = service.reset_password(&token, &password).await?;

    Ok(Json(account))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/users/{id}", rejection(ServerError))]
struct AccountPath {
    id: Id<AccountMarker>,
}

async fn get_account<G: Gateway>(
    AccountPath { id }: AccountPath,
    State(service): State<Arc<Service<G>>>,
) -> Result<Json<Account>> {
    let account = service.get_account(id).await?;

    Ok(Json(account))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/users", rejection(ServerError))]
struct SearchPath();

#[derive(Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    filter: String,
}

async fn search_accounts<G: Gateway>(
    SearchPath(): SearchPath,
    State(service): State<Arc<Service<G>>>,
    _caller: AuthenticatedAccount,
    Query(SearchQuery { filter }): Query<SearchQuery>,
) -> Result<Json<Vec<Account>>> {
    let accounts = service.search_accounts(&search_tokens(&filter)).await?;

    Ok(Json(accounts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/users/{id}", rejection(ServerError))]
struct ProfilePath {
    id: Id<AccountMarker>,
}

async fn update_profile<G: Gateway>(
    ProfilePath { id }: ProfilePath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
    Json(update): Json<UpdateProfile>,
) -> Result<Json<Account>> {
    caller.ensure_may_act_on(id)?;
    let account = service.update_profile(id, update).await?;

    Ok(Json(account))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/users/{id}/near", rejection(ServerError))]
struct NearPath {
    id: Id<AccountMarker>,
}

async fn nearby_accounts<G: Gateway>(
    NearPath { id }: NearPath,
    State(service): State<Arc<Service<G>>>,
    _caller: AuthenticatedAccount,
    Json(point): Json<Coordinates>,
) -> Result<Json<Vec<Account>>> {
    let accounts = service
        .nearby_accounts(id, point, NEARBY_RADIUS_KM)
        .await?;

    Ok(Json(accounts))
}
