use crate::model::{
    Id,
    user::{User, UserMarker},
};
use time::OffsetDateTime;

pub const POST_TEXT_MIN_LEN: usize = 5;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post with its creator resolved.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub creator: User,
    pub content: PostContent,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A post that only carries the raw reference to its creator.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub creator_id: Id<UserMarker>,
    pub content: PostContent,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostContent {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub creator: Id<UserMarker>,
    pub content: PostContent,
}
