use socium_common::{
    geo::Coordinates,
    model::{
        Id, ModelValidationError,
        account::{Account, EmailAddress},
        auth::HashedPassword,
        comment::Comment,
        contact::ContactMessage,
        post::Post,
    },
};
use time::OffsetDateTime;

#[derive(Clone, PartialEq, Debug, sqlx::FromRow)]
pub struct AccountRecord {
    pub account_snowflake: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_activated: bool,
    pub description: String,
    pub profile_image: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub friend_request_snowflakes: Vec<i64>,
    pub friend_snowflakes: Vec<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, sqlx::FromRow)]
pub struct PostRecord {
    pub post_snowflake: i64,
    pub author_snowflake: i64,
    pub description: String,
    pub image: String,
    pub is_private: bool,
    pub liker_snowflakes: Vec<i64>,
    pub comment_snowflakes: Vec<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, sqlx::FromRow)]
pub struct CommentRecord {
    pub comment_snowflake: i64,
    pub author_snowflake: i64,
    pub post_snowflake: i64,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, sqlx::FromRow)]
pub struct ContactRecord {
    pub contact_snowflake: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub message: String,
}

pub fn to_column<M>(id: Id<M>) -> i64 {
    u64::from(id).cast_signed()
}

pub fn to_columns<M: Copy>(ids: &[Id<M>]) -> Vec<i64> {
    ids.iter().copied().map(to_column).collect()
}

fn from_columns<M>(columns: Vec<i64>) -> Vec<Id<M>> {
    columns
        .into_iter()
        .map(|column| column.cast_unsigned().into())
        .collect()
}

impl TryFrom<AccountRecord> for Account {
    type Error = ModelValidationError;

    fn try_from(value: AccountRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.account_snowflake.cast_unsigned().into(),
            name: value.name,
            surname: value.surname,
            email: EmailAddress::new(&value.email)?,
            password_hash: HashedPassword::from_phc_string(value.password_hash),
            role: value.role.parse()?,
            is_activated: value.is_activated,
            description: value.description,
            profile_image: value.profile_image,
            location: Coordinates::from_parts(value.latitude, value.longitude)?,
            friend_request_ids: from_columns(value.friend_request_snowflakes),
            friend_ids: from_columns(value.friend_snowflakes),
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author_id: value.author_snowflake.cast_unsigned().into(),
            description: value.description,
            image: value.image,
            is_private: value.is_private,
            who_likes_ids: from_columns(value.liker_snowflakes),
            comment_ids: from_columns(value.comment_snowflakes),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            author_id: value.author_snowflake.cast_unsigned().into(),
            post_id: value.post_snowflake.cast_unsigned().into(),
            content: value.content,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<ContactRecord> for ContactMessage {
    type Error = ModelValidationError;

    fn try_from(value: ContactRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.contact_snowflake.cast_unsigned().into(),
            name: value.name,
            surname: value.surname,
            email: EmailAddress::new(&value.email)?,
            message: value.message,
        })
    }
}
