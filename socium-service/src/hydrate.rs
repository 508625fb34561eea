use crate::{
    Service,
    error::{Result, ServiceError},
};
use socium_common::model::{
    comment::CommentView,
    post::{Post, PostView},
};
use socium_db::Gateway;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

impl<G: Gateway> Service<G> {
    /// Attaches comments, comment authors and optionally post authors to
    /// `posts` with one comment fetch and one account fetch in total.
    ///
    /// A missing author fails the whole batch, a missing comment is skipped.
    pub(crate) async fn hydrate_posts(
        &self,
        posts: Vec<Post>,
        with_author: bool,
    ) -> Result<Vec<PostView>> {
        let comment_ids: Vec<_> = posts
            .iter()
            .flat_map(|post| post.comment_ids.iter().copied())
            .collect();

        let comments: HashMap<_, _> = self
            .gateway
            .fetch_comments(&comment_ids)
            .await?
            .into_iter()
            .map(|comment| (comment.id, comment))
            .collect();

        let mut author_ids: BTreeSet<_> =
            comments.values().map(|comment| comment.author_id).collect();
        if with_author {
            author_ids.extend(posts.iter().map(|post| post.author_id));
        }
        let author_ids: Vec<_> = author_ids.into_iter().collect();

        let authors: HashMap<_, _> = self
            .gateway
            .fetch_accounts(&author_ids)
            .await?
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        let author = |id| {
            authors
                .get(&id)
                .cloned()
                .ok_or(ServiceError::AccountNotFound(id))
        };

        posts
            .into_iter()
            .map(|post| {
                let user = if with_author {
                    Some(author(post.author_id)?)
                } else {
                    None
                };

                let comments = post
                    .comment_ids
                    .iter()
                    .filter_map(|id| {
                        let comment = comments.get(id);
                        if comment.is_none() {
                            warn!(post = %post.id, comment = %id, "Post references a missing comment");
                        }
                        comment
                    })
                    .map(|comment| {
                        Ok(CommentView {
                            comment: comment.clone(),
                            user: Some(author(comment.author_id)?),
                        })
                    })
                    .collect::<Result<_>>()?;

                Ok(PostView {
                    post,
                    user,
                    comments,
                })
            })
            .collect()
    }
}
