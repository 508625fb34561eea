use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedAccount, extract::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socium_common::model::{
    Id,
    account::{Account, AccountMarker},
};
use socium_db::Gateway;
use socium_service::Service;
use std::sync::Arc;

pub fn routes<G: Gateway>() -> ServerRouter<G> {
    ServerRouter::new()
        .typed_post(send_friend_request::<G>)
        .typed_get(list_friend_requests::<G>)
        .typed_post(resolve_friend_request::<G>)
        .typed_get(list_friends::<G>)
        .typed_delete(unfriend::<G>)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/users/{id}/friend-requests", rejection(ServerError))]
struct FriendRequestsPath {
    id: Id<AccountMarker>,
}

/// The caller asks account `id` for friendship.
async fn send_friend_request<G: Gateway>(
    FriendRequestsPath { id }: FriendRequestsPath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
) -> Result<Json<Account>> {
    let account = service
        .send_friend_request(id, caller.account_id())
        .await?;

    Ok(Json(account))
}

async fn list_friend_requests<G: Gateway>(
    FriendRequestsPath { id }: FriendRequestsPath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
) -> Result<Json<Vec<Account>>> {
    caller.ensure_may_act_on(id)?;
    let requesters = service.list_incoming_friend_requests(id).await?;

    Ok(Json(requesters))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/users/{id}/friend-requests/{requester}", rejection(ServerError))]
struct FriendRequestPath {
    id: Id<AccountMarker>,
    requester: Id<AccountMarker>,
}

#[derive(Deserialize)]
struct Resolution {
    accept: bool,
}

async fn resolve_friend_request<G: Gateway>(
    FriendRequestPath { id, requester }: FriendRequestPath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
    Json(Resolution { accept }): Json<Resolution>,
) -> Result<Json<Account>> {
    caller.ensure_may_act_on(id)?;
    let account = service
        .resolve_friend_request(id, requester, accept)
        .await?;

    Ok(Json(account))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/users/{id}/friends", rejection(ServerError))]
struct FriendsPath {
    id: Id<AccountMarker>,
}

async fn list_friends<G: Gateway>(
    FriendsPath { id }: FriendsPath,
    State(service): State<Arc<Service<G>>>,
    _caller: AuthenticatedAccount,
) -> Result<Json<Vec<Account>>> {
    let friends = service.list_friends(id).await?;

    Ok(Json(friends))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/users/{id}/friends/{friend}", rejection(ServerError))]
struct FriendPath {
    id: Id<AccountMarker>,
    friend: Id<AccountMarker>,
}

async fn unfriend<G: Gateway>(
    FriendPath { id, friend }: FriendPath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
) -> Result<Json<Account>> {
    caller.ensure_may_act_on(id)?;
    let account = service.unfriend(id, friend).await?;

    Ok(Json(account))
}
