//! The narrow storage seam the service layer is written against.
//!
//! Every method is a single round trip. Point fetches and replaces return
//! `None` when the record does not exist, batch fetches silently skip ids
//! that do not resolve and return an empty list for empty input.

use crate::Result;
use socium_common::model::{
    Id,
    account::{Account, AccountMarker, EmailAddress},
    comment::{Comment, CommentMarker},
    contact::{ContactMarker, ContactMessage},
    post::{Post, PostMarker},
};
use std::future::Future;

/// Account scan criteria. All present criteria must hold.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct AccountFilter {
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    /// Case-insensitive substring of the surname.
    pub surname_contains: Option<String>,
    pub activated: Option<bool>,
}

impl AccountFilter {
    /// Builds a filter out of search tokens: the first token matches the
    /// name, the second the surname, anything after that is ignored.
    #[must_use]
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut tokens = tokens.iter().map(|token| token.as_ref().to_owned());

        Self {
            name_contains: tokens.next(),
            surname_contains: tokens.next(),
            activated: None,
        }
    }

    #[must_use]
    pub fn matches(&self, account: &Account) -> bool {
        fn contains_ignore_case(haystack: &str, needle: Option<&String>) -> bool {
            needle.is_none_or(|needle| haystack.to_lowercase().contains(&needle.to_lowercase()))
        }

        contains_ignore_case(&account.name, self.name_contains.as_ref())
            && contains_ignore_case(&account.surname, self.surname_contains.as_ref())
            && self
                .activated
                .is_none_or(|activated| account.is_activated == activated)
    }
}

/// Skip/limit window over an ordered scan. No limit means until the end.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Window {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Window {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }
}

pub trait Gateway: Send + Sync + 'static {
    fn insert_account(&self, account: &Account) -> impl Future<Output = Result<()>> + Send;

    fn fetch_account(
        &self,
        id: Id<AccountMarker>,
    ) -> impl Future<Output = Result<Option<Account>>> + Send;

    fn fetch_account_by_email(
        &self,
        email: &EmailAddress,
    ) -> impl Future<Output = Result<Option<Account>>> + Send;

    /// Result order is unspecified.
    fn fetch_accounts(
        &self,
        ids: &[Id<AccountMarker>],
    ) -> impl Future<Output = Result<Vec<Account>>> + Send;

    /// Accounts matching `filter` in creation order, windowed.
    fn scan_accounts(
        &self,
        filter: &AccountFilter,
        window: Window,
    ) -> impl Future<Output = Result<Vec<Account>>> + Send;

    fn count_accounts(&self, filter: &AccountFilter) -> impl Future<Output = Result<u64>> + Send;

    /// Replaces the whole stored record, returning it if it existed.
    fn replace_account(
        &self,
        account: &Account,
    ) -> impl Future<Output = Result<Option<Account>>> + Send;

    fn insert_post(&self, post: &Post) -> impl Future<Output = Result<()>> + Send;

    fn fetch_post(&self, id: Id<PostMarker>) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// Posts by any of `authors`, newest first.
    fn fetch_posts_by_authors(
        &self,
        authors: &[Id<AccountMarker>],
    ) -> impl Future<Output = Result<Vec<Post>>> + Send;

    fn replace_post(&self, post: &Post) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// Deletes the post only if it was written by `author`.
    fn delete_post_by_author(
        &self,
        id: Id<PostMarker>,
        author: Id<AccountMarker>,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn count_posts(&self) -> impl Future<Output = Result<u64>> + Send;

    fn insert_comment(&self, comment: &Comment) -> impl Future<Output = Result<()>> + Send;

    /// Result order is unspecified.
    fn fetch_comments(
        &self,
        ids: &[Id<CommentMarker>],
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    fn count_comments(&self) -> impl Future<Output = Result<u64>> + Send;

    fn insert_contact(&self, contact: &ContactMessage) -> impl Future<Output = Result<()>> + Send;

    fn fetch_contacts(&self) -> impl Future<Output = Result<Vec<ContactMessage>>> + Send;

    fn delete_contact(&self, id: Id<ContactMarker>) -> impl Future<Output = Result<bool>> + Send;
}
