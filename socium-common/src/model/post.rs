use crate::model::{
    Id,
    account::{Account, AccountMarker},
    comment::{CommentMarker, CommentView},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    #[serde(rename = "userId")]
    pub author_id: Id<AccountMarker>,
    pub description: String,
    pub image: String,
    pub is_private: bool,
    #[serde(rename = "whoLikesUserIds")]
    pub who_likes_ids: Vec<Id<AccountMarker>>,
    pub comment_ids: Vec<Id<CommentMarker>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub is_private: bool,
}

/// A post together with the records it references, assembled at read time.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub user: Option<Account>,
    pub comments: Vec<CommentView>,
}
