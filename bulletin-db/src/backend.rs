use crate::{
    client::DbClient,
    memory::MemoryStore,
    store::{Result, Store},
};
use bulletin_common::model::{
    Id,
    post::{CreatePost, PartialPost, Post, PostContent, PostMarker},
    user::{CreateUser, Email, User, UserCredentials, UserMarker},
};

/// The store selected at startup.
#[derive(Debug)]
pub enum StoreBackend {
    Postgres(DbClient),
    Memory(MemoryStore),
}

macro_rules! dispatch {
    ($self:ident.$method:ident($($arg:expr),*)) => {
        match $self {
            StoreBackend::Postgres(client) => client.$method($($arg),*).await,
            StoreBackend::Memory(store) => store.$method($($arg),*).await,
        }
    };
}

impl Store for StoreBackend {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        dispatch!(self.fetch_user(user_id))
    }

    async fn fetch_credentials(&self, email: &Email) -> Result<Option<UserCredentials>> {
        dispatch!(self.fetch_credentials(email))
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        dispatch!(self.create_user(user))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        dispatch!(self.update_user(user))
    }

    async fn count_posts(&self) -> Result<u64> {
        dispatch!(self.count_posts())
    }

    async fn fetch_posts(&self, offset: u64, limit: u64) -> Result<Vec<Post>> {
        dispatch!(self.fetch_posts(offset, limit))
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        dispatch!(self.fetch_post(post_id))
    }

    async fn fetch_partial_post(&self, post_id: Id<PostMarker>) -> Result<Option<PartialPost>> {
        dispatch!(self.fetch_partial_post(post_id))
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        dispatch!(self.create_post(post))
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        dispatch!(self.update_post(post_id, content))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        dispatch!(self.delete_post(post_id))
    }
}
