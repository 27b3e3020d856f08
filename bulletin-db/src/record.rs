use bulletin_common::model::{
    Id, ModelValidationError,
    post::{PartialPost, Post, PostContent, PostMarker},
    user::{Email, User, UserCredentials},
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub status: String,
    pub post_ids: Vec<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub password_digest: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_id: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub creator: UserRecord,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PartialPostRecord {
    pub post_id: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub creator_id: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.parse()?,
            email: Email::new(&value.email)?,
            name: value.name,
            status: value.status,
            posts: value
                .post_ids
                .iter()
                .map(|post_id| post_id.parse::<Id<PostMarker>>())
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

impl TryFrom<CredentialsRecord> for UserCredentials {
    type Error = ModelValidationError;

    fn try_from(value: CredentialsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user.try_into()?,
            password: value.password_digest.try_into()?,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.parse()?,
            creator: value.creator.try_into()?,
            content: PostContent {
                title: value.title,
                content: value.content,
                image_url: value.image_url,
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

impl TryFrom<PartialPostRecord> for PartialPost {
    type Error = ModelValidationError;

    fn try_from(value: PartialPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.parse()?,
            creator_id: value.creator_id.parse()?,
            content: PostContent {
                title: value.title,
                content: value.content,
                image_url: value.image_url,
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
