use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedAccount,
    extract::{Json, Query},
    routes::parse_id_list,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socium_common::model::{
    Id,
    account::AccountMarker,
    comment::CreateComment,
    post::{CreatePost, Post, PostMarker, PostView},
};
use socium_db::Gateway;
use socium_service::{Service, feed::FeedScope};
use std::sync::Arc;

pub fn routes<G: Gateway>() -> ServerRouter<G> {
    ServerRouter::new()
        .typed_post(create_post::<G>)
        .typed_get(get_feed::<G>)
        .typed_get(get_post::<G>)
        .typed_patch(toggle_like::<G>)
        .typed_post(add_comment::<G>)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/posts", rejection(ServerError))]
struct PostsPath();

async fn create_post<G: Gateway>(
    PostsPath(): PostsPath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
    Json(create): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = service.create_post(caller.account_id(), create).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FeedQuery {
    user_id: Option<Id<AccountMarker>>,
    homepage: bool,
    friend_ids: Option<String>,
}

/// Without `friendIds` the homepage uses the viewer's stored friend list.
async fn get_feed<G: Gateway>(
    PostsPath(): PostsPath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<PostView>>> {
    let viewer = query.user_id.unwrap_or(caller.account_id());
    let scope = if query.homepage {
        FeedScope::Homepage
    } else {
        FeedScope::default()
    };

    let friend_ids = match (&query.friend_ids, scope) {
        (Some(list), _) => parse_id_list(list)?,
        (None, FeedScope::Homepage) => service.get_account(viewer).await?.friend_ids,
        (None, FeedScope::Profile) => Vec::new(),
    };

    let feed = service.get_feed(viewer, scope, &friend_ids).await?;

    Ok(Json(feed))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post<G: Gateway>(
    PostPath { id }: PostPath,
    State(service): State<Arc<Service<G>>>,
    _caller: AuthenticatedAccount,
) -> Result<Json<PostView>> {
    let post = service.get_post(id, true).await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/posts/{id}/like", rejection(ServerError))]
struct LikePath {
    id: Id<PostMarker>,
}

async fn toggle_like<G: Gateway>(
    LikePath { id }: LikePath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
) -> Result<Json<Post>> {
    let post = service.toggle_like(id, caller.account_id()).await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user/posts/{id}/comments", rejection(ServerError))]
struct CommentsPath {
    id: Id<PostMarker>,
}

async fn add_comment<G: Gateway>(
    CommentsPath { id }: CommentsPath,
    State(service): State<Arc<Service<G>>>,
    caller: AuthenticatedAccount,
    Json(create): Json<CreateComment>,
) -> Result<(StatusCode, Json<PostView>)> {
    let post = service.add_comment(id, caller.account_id(), create).await?;

    Ok((StatusCode::CREATED, Json(post)))
}
