use crate::{
    Service,
    error::{Result, ServiceError},
};
use socium_common::{
    model::{
        Id,
        account::AccountMarker,
        comment::{Comment, CreateComment},
        post::{CreatePost, Post, PostMarker, PostView},
    },
    util::{push_unique, timestamp_now, toggle_membership},
};
use socium_db::Gateway;
use std::cmp::Reverse;
use tracing::{debug, info};

/// Which posts make up a feed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum FeedScope {
    /// Posts of the viewer and of the given friends.
    Homepage,
    /// Posts of the viewer only.
    #[default]
    Profile,
}

impl<G: Gateway> Service<G> {
    pub async fn create_post(&self, author: Id<AccountMarker>, create: CreatePost) -> Result<Post> {
        self.fetch_account(author).await?;

        let now = timestamp_now();
        let post = Post {
            id: self.next_id()?,
            author_id: author,
            description: create.description,
            image: create.image,
            is_private: create.is_private,
            who_likes_ids: Vec::new(),
            comment_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.gateway.insert_post(&post).await?;
        info!(post = %post.id, %author, "Created post");
        Ok(post)
    }

    /// Hydrated posts, newest first.
    ///
    /// Private posts are not filtered out in either scope.
    pub async fn get_feed(
        &self,
        viewer: Id<AccountMarker>,
        scope: FeedScope,
        friend_ids: &[Id<AccountMarker>],
    ) -> Result<Vec<PostView>> {
        let mut authors = vec![viewer];
        if scope == FeedScope::Homepage {
            for &friend in friend_ids {
                push_unique(&mut authors, friend);
            }
        }

        let mut posts = self.gateway.fetch_posts_by_authors(&authors).await?;
        posts.sort_by_key(|post| Reverse((post.created_at, post.id)));
        debug!(%viewer, ?scope, posts = posts.len(), "Composing feed");

        self.hydrate_posts(posts, true).await
    }

    /// A single post with its comments, and its author if `with_author`.
    pub async fn get_post(&self, id: Id<PostMarker>, with_author: bool) -> Result<PostView> {
        let post = self.fetch_post(id).await?;

        self.hydrate_posts(vec![post], with_author)
            .await?
            .pop()
            .ok_or(ServiceError::PostNotFound(id))
    }

    /// Likes the post for `account`, or takes the like back.
    pub async fn toggle_like(&self, id: Id<PostMarker>, account: Id<AccountMarker>) -> Result<Post> {
        let mut post = self.fetch_post(id).await?;

        let liked = toggle_membership(&mut post.who_likes_ids, account);
        post.updated_at = timestamp_now();

        let post = self.replace_post(&post).await?;
        debug!(post = %id, %account, liked, "Toggled like");
        Ok(post)
    }

    /// Stores the comment before the post is looked up, so a comment on a
    /// missing post is left behind unreferenced.
    pub async fn add_comment(
        &self,
        id: Id<PostMarker>,
        author: Id<AccountMarker>,
        create: CreateComment,
    ) -> Result<PostView> {
        let now = timestamp_now();
        let comment = Comment {
            id: self.next_id()?,
            author_id: author,
            post_id: id,
            content: create.content,
            created_at: now,
            updated_at: now,
        };
        self.gateway.insert_comment(&comment).await?;

        let mut post = self.fetch_post(id).await?;
        post.comment_ids.push(comment.id);
        post.updated_at = now;
        self.replace_post(&post).await?;
        info!(post = %id, comment = %comment.id, %author, "Added comment");

        self.get_post(id, true).await
    }

    /// Posts of `author`, newest first, stamped with the author but without
    /// comments.
    pub async fn get_account_posts(&self, author: Id<AccountMarker>) -> Result<Vec<PostView>> {
        let account = self.fetch_account(author).await?;

        let posts = self.gateway.fetch_posts_by_authors(&[author]).await?;
        let views = posts
            .into_iter()
            .map(|post| PostView {
                post,
                user: Some(account.clone()),
                comments: Vec::new(),
            })
            .collect();
        Ok(views)
    }

    pub async fn admin_delete_post(
        &self,
        id: Id<PostMarker>,
        author: Id<AccountMarker>,
    ) -> Result<()> {
        if !self.gateway.delete_post_by_author(id, author).await? {
            return Err(ServiceError::PostNotFound(id));
        }

        info!(post = %id, %author, "Deleted post");
        Ok(())
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Post> {
        self.gateway
            .fetch_post(id)
            .await?
            .ok_or(ServiceError::PostNotFound(id))
    }

    async fn replace_post(&self, post: &Post) -> Result<Post> {
        self.gateway
            .replace_post(post)
            .await?
            .ok_or(ServiceError::PostNotFound(post.id))
    }
}
