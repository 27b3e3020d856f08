use bulletin_common::model::{
    Id, ModelValidationError,
    post::{CreatePost, PartialPost, Post, PostContent, PostMarker},
    user::{CreateUser, Email, User, UserCredentials, UserMarker},
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A user with e-mail {0} exists already")]
    DuplicateEmail(String),
    #[error("Post creator {0} does not exist")]
    MissingCreator(Id<UserMarker>),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Users and posts. Identifiers and timestamps are assigned by the store.
///
/// Writes are not transactional across calls: a read followed by
/// [`Store::update_user`] overwrites whatever another request wrote in between.
pub trait Store: Send + Sync {
    fn fetch_user(
        &self,
        user_id: Id<UserMarker>,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Looks a user up by e-mail, including the password digest.
    fn fetch_credentials(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<UserCredentials>>> + Send;

    /// Fails with [`DbError::DuplicateEmail`] if the e-mail is taken.
    fn create_user(&self, user: &CreateUser) -> impl Future<Output = Result<User>> + Send;

    /// Persists status and owned posts of an existing user.
    fn update_user(&self, user: &User) -> impl Future<Output = Result<()>> + Send;

    fn count_posts(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Posts newest first, creators resolved.
    fn fetch_posts(&self, offset: u64, limit: u64)
    -> impl Future<Output = Result<Vec<Post>>> + Send;

    fn fetch_post(&self, post_id: Id<PostMarker>)
    -> impl Future<Output = Result<Option<Post>>> + Send;

    fn fetch_partial_post(
        &self,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = Result<Option<PartialPost>>> + Send;

    fn create_post(&self, post: &CreatePost) -> impl Future<Output = Result<Post>> + Send;

    /// Replaces title, content and image reference. `None` if the post is gone.
    fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// Returns whether a post was deleted.
    fn delete_post(&self, post_id: Id<PostMarker>) -> impl Future<Output = Result<bool>> + Send;
}
