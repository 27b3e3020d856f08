//! The operations clients can perform on users and posts.
//!
//! Every operation that needs a signed-in user receives the caller's
//! [`Identity`] and rejects [`Identity::Anonymous`] itself.

pub mod error;
mod validation;

use crate::storage::ImageStorage;
use bulletin_common::model::{
    Id,
    auth::{Identity, PasswordDigest, TokenKeys},
    post::{CreatePost, Post, PostContent, PostMarker},
    user::{CreateUser, Email, User, UserMarker},
};
use bulletin_db::store::{DbError, Store};
use error::ServiceError;
use tracing::{debug, info};

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

pub const POSTS_PER_PAGE: u64 = 2;

/// Sent as image reference by clients that want to keep the current image.
pub const UNCHANGED_IMAGE: &str = "undefined";

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct UserInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthData {
    pub token: String,
    pub user_id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_posts: u64,
}

#[derive(Debug)]
pub struct ContentService<S, I> {
    store: S,
    images: I,
    tokens: TokenKeys,
}

fn require_user(identity: &Identity) -> Result<Id<UserMarker>> {
    identity.user_id().ok_or(ServiceError::NotAuthenticated)
}

/// Unparseable ids cannot name an existing post.
fn parse_post_id(post_id: &str) -> Result<Id<PostMarker>> {
    post_id.parse().map_err(|_| ServiceError::PostNotFound)
}

async fn hash_password(password: String) -> Result<PasswordDigest> {
    let digest = tokio::task::spawn_blocking(move || PasswordDigest::hash(&password)).await??;
    Ok(digest)
}

async fn verify_password(digest: PasswordDigest, password: String) -> Result<bool> {
    let matches = tokio::task::spawn_blocking(move || digest.verify(&password)).await?;
    Ok(matches)
}

impl<S: Store, I: ImageStorage> ContentService<S, I> {
    #[must_use]
    pub fn new(store: S, images: I, tokens: TokenKeys) -> Self {
        Self {
            store,
            images,
            tokens,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }

    pub async fn register(&self, input: UserInput) -> Result<User> {
        let email = validation::validate_user(&input)?;

        if self.store.fetch_credentials(&email).await?.is_some() {
            return Err(ServiceError::UserExists);
        }

        let password = hash_password(input.password).await?;
        let user = self
            .store
            .create_user(&CreateUser {
                email,
                name: input.name,
                password,
            })
            .await
            .map_err(|err| match err {
                DbError::DuplicateEmail(_) => ServiceError::UserExists,
                err => err.into(),
            })?;

        info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: String) -> Result<AuthData> {
        let email = Email::new(email).map_err(|_| ServiceError::UnknownEmail)?;
        let credentials = self
            .store
            .fetch_credentials(&email)
            .await?
            .ok_or(ServiceError::UnknownEmail)?;

        if !verify_password(credentials.password, password).await? {
            return Err(ServiceError::WrongPassword);
        }

        let token = self.tokens.issue(&credentials.user)?;

        info!(user_id = %credentials.user.id, "User logged in");
        Ok(AuthData {
            token,
            user_id: credentials.user.id,
        })
    }

    pub async fn create_post(&self, identity: &Identity, input: PostInput) -> Result<Post> {
        let user_id = require_user(identity)?;
        validation::validate_post(&input)?;

        let mut user = self
            .store
            .fetch_user(user_id)
            .await?
            .ok_or(ServiceError::InvalidUser)?;

        let post = self
            .store
            .create_post(&CreatePost {
                creator: user_id,
                content: PostContent {
                    title: input.title,
                    content: input.content,
                    image_url: input.image_url,
                },
            })
            .await?;

        user.posts.push(post.id);
        self.store.update_user(&user).await?;

        info!(post_id = %post.id, %user_id, "Created post");
        Ok(Post {
            creator: user,
            ..post
        })
    }

    pub async fn list_posts(&self, identity: &Identity, page: Option<i32>) -> Result<PostPage> {
        require_user(identity)?;

        let page = u64::from(page.unwrap_or(1).max(1).unsigned_abs());
        let total_posts = self.store.count_posts().await?;
        let posts = self
            .store
            .fetch_posts((page - 1) * POSTS_PER_PAGE, POSTS_PER_PAGE)
            .await?;

        debug!(page, total_posts, returned = posts.len(), "Listed posts");
        Ok(PostPage { posts, total_posts })
    }

    pub async fn get_post(&self, identity: &Identity, post_id: &str) -> Result<Post> {
        require_user(identity)?;
        let post_id = parse_post_id(post_id)?;

        self.store
            .fetch_post(post_id)
            .await?
            .ok_or(ServiceError::PostNotFound)
    }

    pub async fn update_post(
        &self,
        identity: &Identity,
        post_id: &str,
        input: PostInput,
    ) -> Result<Post> {
        let user_id = require_user(identity)?;
        let post_id = parse_post_id(post_id)?;

        let post = self
            .store
            .fetch_post(post_id)
            .await?
            .ok_or(ServiceError::PostNotFound)?;
        if post.creator.id != user_id {
            return Err(ServiceError::Forbidden);
        }

        validation::validate_post(&input)?;

        let image_url = match input.image_url {
            Some(image_url) if image_url != UNCHANGED_IMAGE => Some(image_url),
            _ => post.content.image_url,
        };
        let content = PostContent {
            title: input.title,
            content: input.content,
            image_url,
        };

        let updated = self
            .store
            .update_post(post_id, &content)
            .await?
            .ok_or(ServiceError::PostNotFound)?;

        info!(%post_id, "Updated post");
        Ok(updated)
    }

    pub async fn delete_post(&self, identity: &Identity, post_id: &str) -> Result<bool> {
        let user_id = require_user(identity)?;
        let post_id = parse_post_id(post_id)?;

        let post = self
            .store
            .fetch_partial_post(post_id)
            .await?
            .ok_or(ServiceError::PostNotFound)?;
        if post.creator_id != user_id {
            return Err(ServiceError::Forbidden);
        }

        let mut user = self
            .store
            .fetch_user(user_id)
            .await?
            .ok_or(ServiceError::InvalidUser)?;

        if let Some(image_url) = &post.content.image_url {
            self.images.delete(image_url).await;
        }

        user.unlink_post(post_id);
        self.store.update_user(&user).await?;
        self.store.delete_post(post_id).await?;

        info!(%post_id, "Deleted post");
        Ok(true)
    }

    pub async fn current_user(&self, identity: &Identity) -> Result<User> {
        let user_id = require_user(identity)?;

        self.store
            .fetch_user(user_id)
            .await?
            .ok_or(ServiceError::InvalidUser)
    }

    pub async fn update_status(&self, identity: &Identity, status: String) -> Result<User> {
        let user_id = require_user(identity)?;

        let mut user = self
            .store
            .fetch_user(user_id)
            .await?
            .ok_or(ServiceError::InvalidUser)?;
        user.status = status;
        self.store.update_user(&user).await?;

        debug!(%user_id, "Updated status");
        Ok(user)
    }
}

#[cfg(test)]
mod tests;
