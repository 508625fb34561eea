use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AdminAccount,
    extract::{Json, Query},
    routes::search_tokens,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socium_common::model::{
    Id,
    account::{Account, AccountMarker},
    dashboard::DashboardSummary,
    page::{AccountPage, PageRequest},
    post::{PostMarker, PostView},
};
use socium_db::Gateway;
use socium_service::Service;
use std::sync::Arc;
use tracing::info;

pub fn routes<G: Gateway>() -> ServerRouter<G> {
    ServerRouter::new()
        .typed_get(list_accounts::<G>)
        .typed_get(get_account::<G>)
        .typed_get(get_account_posts::<G>)
        .typed_delete(delete_post::<G>)
        .typed_get(dashboard::<G>)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users", rejection(ServerError))]
struct AccountsPath();

/// Missing `page` and `size` select everything.
#[derive(Default, Deserialize)]
#[serde(default)]
struct AccountListQuery {
    page: u32,
    size: u32,
    filter: String,
}

async fn list_accounts<G: Gateway>(
    AccountsPath(): AccountsPath,
    State(service): State<Arc<Service<G>>>,
    _admin: AdminAccount,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<AccountPage>> {
    let request = PageRequest::new(query.page, query.size);
    let page = service
        .list_accounts(request, &search_tokens(&query.filter))
        .await?;

    Ok(Json(page))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users/{id}", rejection(ServerError))]
struct AccountPath {
    id: Id<AccountMarker>,
}

async fn get_account<G: Gateway>(
    AccountPath { id }: AccountPath,
    State(service): State<Arc<Service<G>>>,
    _admin: AdminAccount,
) -> Result<Json<Account>> {
    let account = service.get_account(id).await?;

    Ok(Json(account))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users/{id}/posts", rejection(ServerError))]
struct AccountPostsPath {
    id: Id<AccountMarker>,
}

async fn get_account_posts<G: Gateway>(
    AccountPostsPath { id }: AccountPostsPath,
    State(service): State<Arc<Service<G>>>,
    _admin: AdminAccount,
) -> Result<Json<Vec<PostView>>> {
    let posts = service.get_account_posts(id).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users/{id}/posts/{post}", rejection(ServerError))]
struct AccountPostPath {
    id: Id<AccountMarker>,
    post: Id<PostMarker>,
}

async fn delete_post<G: Gateway>(
    AccountPostPath { id, post }: AccountPostPath,
    State(service): State<Arc<Service<G>>>,
    admin: AdminAccount,
) -> Result<StatusCode> {
    service.admin_delete_post(post, id).await?;
    info!(admin = %admin.account_id(), %post, "Admin removed post");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/dashboard", rejection(ServerError))]
struct DashboardPath();

async fn dashboard<G: Gateway>(
    DashboardPath(): DashboardPath,
    State(service): State<Arc<Service<G>>>,
    _admin: AdminAccount,
) -> Result<Json<DashboardSummary>> {
    let summary = service.dashboard().await?;

    Ok(Json(summary))
}
