use crate::{
    DbError, Result,
    gateway::{AccountFilter, Gateway, Window},
};
use socium_common::model::{
    Id,
    account::{Account, AccountMarker, EmailAddress},
    comment::{Comment, CommentMarker},
    contact::{ContactMarker, ContactMessage},
    post::{Post, PostMarker},
};
use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<Id<AccountMarker>, Account>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    comments: BTreeMap<Id<CommentMarker>, Comment>,
    contacts: BTreeMap<Id<ContactMarker>, ContactMessage>,
    refused_account_writes: BTreeSet<Id<AccountMarker>>,
}

/// Process-local [`Gateway`]. Used when no database is configured and in tests.
///
/// Ids are snowflakes and therefore ordered by creation, which gives scans
/// the same order the Postgres implementation uses.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later write of the given account fail.
    pub fn fail_account_writes(&self, id: Id<AccountMarker>) {
        self.tables().refused_account_writes.insert(id);
    }

    pub fn allow_account_writes(&self, id: Id<AccountMarker>) {
        self.tables().refused_account_writes.remove(&id);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tables {
    fn check_account_write(&self, id: Id<AccountMarker>) -> Result<()> {
        if self.refused_account_writes.contains(&id) {
            Err(DbError::WriteRefused(id.into()))
        } else {
            Ok(())
        }
    }
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

impl Gateway for MemoryStore {
    async fn insert_account(&self, account: &Account) -> Result<()> {
        let mut tables = self.tables();
        tables.check_account_write(account.id)?;

        let taken = tables
            .accounts
            .values()
            .any(|stored| stored.email == account.email && stored.id != account.id);
        if taken {
            return Err(DbError::EmailTaken(account.email.clone()));
        }

        tables.accounts.insert(account.id, account.clone());
        debug!(account = %account.id, "Inserted account");
        Ok(())
    }

    async fn fetch_account(&self, id: Id<AccountMarker>) -> Result<Option<Account>> {
        Ok(self.tables().accounts.get(&id).cloned())
    }

    async fn fetch_account_by_email(&self, email: &EmailAddress) -> Result<Option<Account>> {
        let account = self
            .tables()
            .accounts
            .values()
            .find(|account| &account.email == email)
            .cloned();
        Ok(account)
    }

    async fn fetch_accounts(&self, ids: &[Id<AccountMarker>]) -> Result<Vec<Account>> {
        let tables = self.tables();
        let accounts = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| tables.accounts.get(id).cloned())
            .collect();
        Ok(accounts)
    }

    async fn scan_accounts(&self, filter: &AccountFilter, window: Window) -> Result<Vec<Account>> {
        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let limit = window
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        let accounts = self
            .tables()
            .accounts
            .values()
            .filter(|account| filter.matches(account))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect();
        Ok(accounts)
    }

    async fn count_accounts(&self, filter: &AccountFilter) -> Result<u64> {
        let tables = self.tables();
        let matching = tables
            .accounts
            .values()
            .filter(|account| filter.matches(account))
            .count();
        Ok(count(matching))
    }

    async fn replace_account(&self, account: &Account) -> Result<Option<Account>> {
        let mut tables = self.tables();
        tables.check_account_write(account.id)?;

        let Some(stored) = tables.accounts.get_mut(&account.id) else {
            return Ok(None);
        };
        *stored = account.clone();
        Ok(Some(account.clone()))
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        self.tables().posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.tables().posts.get(&id).cloned())
    }

    async fn fetch_posts_by_authors(&self, authors: &[Id<AccountMarker>]) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .tables()
            .posts
            .values()
            .filter(|post| authors.contains(&post.author_id))
            .cloned()
            .collect();

        posts.sort_by_key(|post| Reverse((post.created_at, post.id)));
        Ok(posts)
    }

    async fn replace_post(&self, post: &Post) -> Result<Option<Post>> {
        let mut tables = self.tables();
        let Some(stored) = tables.posts.get_mut(&post.id) else {
            return Ok(None);
        };
        *stored = post.clone();
        Ok(Some(post.clone()))
    }

    async fn delete_post_by_author(
        &self,
        id: Id<PostMarker>,
        author: Id<AccountMarker>,
    ) -> Result<bool> {
        let mut tables = self.tables();
        let owned = tables
            .posts
            .get(&id)
            .is_some_and(|post| post.author_id == author);

        if owned {
            tables.posts.remove(&id);
        }
        Ok(owned)
    }

    async fn count_posts(&self) -> Result<u64> {
        Ok(count(self.tables().posts.len()))
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        self.tables().comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn fetch_comments(&self, ids: &[Id<CommentMarker>]) -> Result<Vec<Comment>> {
        let tables = self.tables();
        let comments = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| tables.comments.get(id).cloned())
            .collect();
        Ok(comments)
    }

    async fn count_comments(&self) -> Result<u64> {
        Ok(count(self.tables().comments.len()))
    }

    async fn insert_contact(&self, contact: &ContactMessage) -> Result<()> {
        self.tables().contacts.insert(contact.id, contact.clone());
        Ok(())
    }

    async fn fetch_contacts(&self) -> Result<Vec<ContactMessage>> {
        Ok(self.tables().contacts.values().cloned().collect())
    }

    async fn delete_contact(&self, id: Id<ContactMarker>) -> Result<bool> {
        Ok(self.tables().contacts.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        DbError,
        gateway::{AccountFilter, Gateway, Window},
        memory::MemoryStore,
    };
    use socium_common::model::{
        Id,
        account::{Account, AccountMarker, EmailAddress, Role},
        auth::HashedPassword,
        post::Post,
    };
    use time::{Duration, macros::datetime};

    fn account(id: u64, name: &str, surname: &str) -> Account {
        Account {
            id: Id::from(id),
            name: name.to_owned(),
            surname: surname.to_owned(),
            email: EmailAddress::new(&format!("{id}@example.com")).unwrap(),
            password_hash: HashedPassword::from_phc_string(String::new()),
            role: Role::User,
            is_activated: id % 2 == 0,
            description: String::new(),
            profile_image: String::new(),
            location: None,
            friend_request_ids: Vec::new(),
            friend_ids: Vec::new(),
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    fn post(id: u64, author: u64, minute: i64) -> Post {
        let created_at = datetime!(2024-01-01 0:00 UTC) + Duration::minutes(minute);
        Post {
            id: Id::from(id),
            author_id: Id::from(author),
            description: format!("post {id}"),
            image: String::new(),
            is_private: false,
            who_likes_ids: Vec::new(),
            comment_ids: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn scan_filters_and_windows() {
        let store = MemoryStore::new();
        for (id, name, surname) in [
            (1, "Ada", "Lovelace"),
            (2, "Adam", "Smith"),
            (3, "Grace", "Hopper"),
            (4, "Adalbert", "Stifter"),
        ] {
            store.insert_account(&account(id, name, surname)).await.unwrap();
        }

        let filter = AccountFilter::from_tokens(&["ADA"]);
        assert_eq!(store.count_accounts(&filter).await.unwrap(), 3);

        let window = Window {
            skip: 1,
            limit: Some(1),
        };
        let scanned = store.scan_accounts(&filter, window).await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].name, "Adam");

        let both = AccountFilter::from_tokens(&["ada", "st"]);
        let scanned = store.scan_accounts(&both, Window::all()).await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].name, "Adalbert");

        let activated = AccountFilter {
            activated: Some(true),
            ..AccountFilter::default()
        };
        assert_eq!(store.count_accounts(&activated).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn batch_fetch_skips_unknown() {
        let store = MemoryStore::new();
        store.insert_account(&account(1, "a", "b")).await.unwrap();

        assert!(store.fetch_accounts(&[]).await.unwrap().is_empty());

        let ids: [Id<AccountMarker>; 3] = [Id::from(1), Id::from(9), Id::from(1)];
        let fetched = store.fetch_accounts(&ids).await.unwrap();
        assert_eq!(fetched.len(), 1);
    }

    #[tokio::test]
    async fn email_is_unique() {
        let store = MemoryStore::new();
        store.insert_account(&account(1, "a", "b")).await.unwrap();

        let mut twin = account(2, "c", "d");
        twin.email = EmailAddress::new("1@example.com").unwrap();
        assert!(matches!(
            store.insert_account(&twin).await,
            Err(DbError::EmailTaken(email)) if email.get() == "1@example.com"
        ));
        assert!(store.fetch_account(Id::from(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.replace_account(&account(1, "a", "b")).await.unwrap(), None);
        assert!(store.fetch_account(Id::from(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refused_writes() {
        let store = MemoryStore::new();
        let account = account(1, "a", "b");
        store.insert_account(&account).await.unwrap();

        store.fail_account_writes(account.id);
        assert!(matches!(
            store.replace_account(&account).await,
            Err(DbError::WriteRefused(1))
        ));

        store.allow_account_writes(account.id);
        assert!(store.replace_account(&account).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn posts_newest_first() {
        let store = MemoryStore::new();
        store.insert_post(&post(1, 10, 0)).await.unwrap();
        store.insert_post(&post(2, 11, 5)).await.unwrap();
        store.insert_post(&post(3, 12, 9)).await.unwrap();
        store.insert_post(&post(4, 10, 5)).await.unwrap();

        let authors = [Id::from(10), Id::from(11)];
        let posts = store.fetch_posts_by_authors(&authors).await.unwrap();
        let ids: Vec<u64> = posts.iter().map(|post| post.id.into()).collect();
        assert_eq!(ids, [4, 2, 1]);
    }

    #[tokio::test]
    async fn delete_checks_author() {
        let store = MemoryStore::new();
        store.insert_post(&post(1, 10, 0)).await.unwrap();

        assert!(!store.delete_post_by_author(Id::from(1), Id::from(11)).await.unwrap());
        assert!(store.delete_post_by_author(Id::from(1), Id::from(10)).await.unwrap());
        assert!(store.fetch_post(Id::from(1)).await.unwrap().is_none());
    }
}
