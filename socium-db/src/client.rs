use crate::{
    DbError, Result,
    gateway::{AccountFilter, Gateway, Window},
    record::{AccountRecord, CommentRecord, ContactRecord, PostRecord, to_column, to_columns},
};
use socium_common::model::{
    Id,
    account::{Account, AccountMarker, EmailAddress},
    comment::{Comment, CommentMarker},
    contact::{ContactMarker, ContactMessage},
    post::{Post, PostMarker},
};
use sqlx::{PgPool, migrate::Migrator, query, query_as, query_scalar};
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const ACCOUNT_EMAIL_CONSTRAINT: &str = "accounts_email_key";

/// Turns a unique violation on the account email into [`DbError::EmailTaken`].
fn email_taken(error: sqlx::Error, email: &EmailAddress) -> DbError {
    match &error {
        sqlx::Error::Database(database_error)
            if database_error.is_unique_violation()
                && database_error.constraint() == Some(ACCOUNT_EMAIL_CONSTRAINT) =>
        {
            DbError::EmailTaken(email.clone())
        }
        _ => DbError::Sqlx(error),
    }
}

macro_rules! select_accounts {
    ($tail:literal) => {
        concat!(
            "
            SELECT
                account_snowflake, name, surname, email, password_hash, role,
                is_activated, description, profile_image, latitude, longitude,
                friend_request_snowflakes, friend_snowflakes, created_at, updated_at
            FROM
                socium.accounts
            ",
            $tail
        )
    };
}

macro_rules! select_posts {
    ($tail:literal) => {
        concat!(
            "
            SELECT
                post_snowflake, author_snowflake, description, image, is_private,
                liker_snowflakes, comment_snowflakes, created_at, updated_at
            FROM
                socium.posts
            ",
            $tail
        )
    };
}

/// Postgres backed [`Gateway`].
#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        info!("Connected to the database");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database schema is up to date");
        Ok(())
    }
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards in the needle
/// taken literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Gateway for DbClient {
    async fn insert_account(&self, account: &Account) -> Result<()> {
        query(
            "
            INSERT INTO socium.accounts (
                account_snowflake, name, surname, email, password_hash, role,
                is_activated, description, profile_image, latitude, longitude,
                friend_request_snowflakes, friend_snowflakes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ",
        )
        .bind(to_column(account.id))
        .bind(&account.name)
        .bind(&account.surname)
        .bind(account.email.get())
        .bind(account.password_hash.as_phc_str())
        .bind(account.role.as_str())
        .bind(account.is_activated)
        .bind(&account.description)
        .bind(&account.profile_image)
        .bind(account.location.map(|location| location.latitude()))
        .bind(account.location.map(|location| location.longitude()))
        .bind(to_columns(&account.friend_request_ids))
        .bind(to_columns(&account.friend_ids))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| email_taken(error, &account.email))?;

        Ok(())
    }

    async fn fetch_account(&self, id: Id<AccountMarker>) -> Result<Option<Account>> {
        let record = query_as::<_, AccountRecord>(select_accounts!(
            "WHERE account_snowflake = $1"
        ))
        .bind(to_column(id))
        .fetch_optional(&self.pool)
        .await?;

        let account = record.map(Account::try_from).transpose()?;
        Ok(account)
    }

    async fn fetch_account_by_email(&self, email: &EmailAddress) -> Result<Option<Account>> {
        let record = query_as::<_, AccountRecord>(select_accounts!("WHERE email = $1"))
            .bind(email.get())
            .fetch_optional(&self.pool)
            .await?;

        let account = record.map(Account::try_from).transpose()?;
        Ok(account)
    }

    async fn fetch_accounts(&self, ids: &[Id<AccountMarker>]) -> Result<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = query_as::<_, AccountRecord>(select_accounts!(
            "WHERE account_snowflake = ANY($1)"
        ))
        .bind(to_columns(ids))
        .fetch_all(&self.pool)
        .await?;

        let accounts = records
            .into_iter()
            .map(Account::try_from)
            .collect::<Result<_, _>>()?;
        Ok(accounts)
    }

    async fn scan_accounts(&self, filter: &AccountFilter, window: Window) -> Result<Vec<Account>> {
        let records = query_as::<_, AccountRecord>(select_accounts!(
            "
            WHERE
                ($1::TEXT IS NULL OR name ILIKE $1)
                AND ($2::TEXT IS NULL OR surname ILIKE $2)
                AND ($3::BOOLEAN IS NULL OR is_activated = $3)
            ORDER BY account_snowflake
            OFFSET $4
            LIMIT $5
            "
        ))
        .bind(filter.name_contains.as_deref().map(contains_pattern))
        .bind(filter.surname_contains.as_deref().map(contains_pattern))
        .bind(filter.activated)
        .bind(saturating_i64(window.skip))
        .bind(window.limit.map(saturating_i64))
        .fetch_all(&self.pool)
        .await?;

        let accounts = records
            .into_iter()
            .map(Account::try_from)
            .collect::<Result<_, _>>()?;
        Ok(accounts)
    }

    async fn count_accounts(&self, filter: &AccountFilter) -> Result<u64> {
        let count = query_scalar::<_, i64>(
            "
            SELECT COUNT(*)
            FROM socium.accounts
            WHERE
                ($1::TEXT IS NULL OR name ILIKE $1)
                AND ($2::TEXT IS NULL OR surname ILIKE $2)
                AND ($3::BOOLEAN IS NULL OR is_activated = $3)
            ",
        )
        .bind(filter.name_contains.as_deref().map(contains_pattern))
        .bind(filter.surname_contains.as_deref().map(contains_pattern))
        .bind(filter.activated)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.cast_unsigned())
    }

    async fn replace_account(&self, account: &Account) -> Result<Option<Account>> {
        let record = query_as::<_, AccountRecord>(
            "
            UPDATE socium.accounts
            SET
                name = $2,
                surname = $3,
                email = $4,
                password_hash = $5,
                role = $6,
                is_activated = $7,
                description = $8,
                profile_image = $9,
                latitude = $10,
                longitude = $11,
                friend_request_snowflakes = $12,
                friend_snowflakes = $13,
                updated_at = $14
            WHERE account_snowflake = $1
            RETURNING
                account_snowflake, name, surname, email, password_hash, role,
                is_activated, description, profile_image, latitude, longitude,
                friend_request_snowflakes, friend_snowflakes, created_at, updated_at
            ",
        )
        .bind(to_column(account.id))
        .bind(&account.name)
        .bind(&account.surname)
        .bind(account.email.get())
        .bind(account.password_hash.as_phc_str())
        .bind(account.role.as_str())
        .bind(account.is_activated)
        .bind(&account.description)
        .bind(&account.profile_image)
        .bind(account.location.map(|location| location.latitude()))
        .bind(account.location.map(|location| location.longitude()))
        .bind(to_columns(&account.friend_request_ids))
        .bind(to_columns(&account.friend_ids))
        .bind(account.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        let account = record.map(Account::try_from).transpose()?;
        Ok(account)
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        query(
            "
            INSERT INTO socium.posts (
                post_snowflake, author_snowflake, description, image, is_private,
                liker_snowflakes, comment_snowflakes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(to_column(post.id))
        .bind(to_column(post.author_id))
        .bind(&post.description)
        .bind(&post.image)
        .bind(post.is_private)
        .bind(to_columns(&post.who_likes_ids))
        .bind(to_columns(&post.comment_ids))
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(select_posts!("WHERE post_snowflake = $1"))
            .bind(to_column(id))
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Post::from))
    }

    async fn fetch_posts_by_authors(&self, authors: &[Id<AccountMarker>]) -> Result<Vec<Post>> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let records = query_as::<_, PostRecord>(select_posts!(
            "
            WHERE author_snowflake = ANY($1)
            ORDER BY created_at DESC, post_snowflake DESC
            "
        ))
        .bind(to_columns(authors))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Post::from).collect())
    }

    async fn replace_post(&self, post: &Post) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            UPDATE socium.posts
            SET
                description = $2,
                image = $3,
                is_private = $4,
                liker_snowflakes = $5,
                comment_snowflakes = $6,
                updated_at = $7
            WHERE post_snowflake = $1
            RETURNING
                post_snowflake, author_snowflake, description, image, is_private,
                liker_snowflakes, comment_snowflakes, created_at, updated_at
            ",
        )
        .bind(to_column(post.id))
        .bind(&post.description)
        .bind(&post.image)
        .bind(post.is_private)
        .bind(to_columns(&post.who_likes_ids))
        .bind(to_columns(&post.comment_ids))
        .bind(post.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    async fn delete_post_by_author(
        &self,
        id: Id<PostMarker>,
        author: Id<AccountMarker>,
    ) -> Result<bool> {
        let result = query(
            "
            DELETE FROM socium.posts
            WHERE post_snowflake = $1 AND author_snowflake = $2
            ",
        )
        .bind(to_column(id))
        .bind(to_column(author))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self) -> Result<u64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM socium.posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.cast_unsigned())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        query(
            "
            INSERT INTO socium.comments (
                comment_snowflake, author_snowflake, post_snowflake, content,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(to_column(comment.id))
        .bind(to_column(comment.author_id))
        .bind(to_column(comment.post_id))
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_comments(&self, ids: &[Id<CommentMarker>]) -> Result<Vec<Comment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comment_snowflake, author_snowflake, post_snowflake, content,
                created_at, updated_at
            FROM
                socium.comments
            WHERE
                comment_snowflake = ANY($1)
            ",
        )
        .bind(to_columns(ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Comment::from).collect())
    }

    async fn count_comments(&self) -> Result<u64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM socium.comments")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.cast_unsigned())
    }

    async fn insert_contact(&self, contact: &ContactMessage) -> Result<()> {
        query(
            "
            INSERT INTO socium.contact_messages (contact_snowflake, name, surname, email, message)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(to_column(contact.id))
        .bind(&contact.name)
        .bind(&contact.surname)
        .bind(contact.email.get())
        .bind(&contact.message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_contacts(&self) -> Result<Vec<ContactMessage>> {
        let records = query_as::<_, ContactRecord>(
            "
            SELECT contact_snowflake, name, surname, email, message
            FROM socium.contact_messages
            ORDER BY contact_snowflake
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let contacts = records
            .into_iter()
            .map(ContactMessage::try_from)
            .collect::<Result<_, _>>()?;
        Ok(contacts)
    }

    async fn delete_contact(&self, id: Id<ContactMarker>) -> Result<bool> {
        let result = query("DELETE FROM socium.contact_messages WHERE contact_snowflake = $1")
            .bind(to_column(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        DbError,
        client::{contains_pattern, email_taken},
    };
    use socium_common::model::account::EmailAddress;

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("ada"), "%ada%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn other_errors_are_not_taken_emails() {
        let email = EmailAddress::new("ada@example.com").unwrap();
        assert!(matches!(
            email_taken(sqlx::Error::RowNotFound, &email),
            DbError::Sqlx(sqlx::Error::RowNotFound)
        ));
    }
}
