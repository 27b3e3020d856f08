//! A [`Store`] kept entirely in process memory.

use crate::store::{DbError, Result, Store};
use bulletin_common::{
    model::{
        Id,
        post::{CreatePost, PartialPost, Post, PostContent, PostMarker},
        user::{CreateUser, DEFAULT_STATUS, Email, User, UserCredentials, UserMarker},
    },
    object_id::ObjectIdGenerator,
};
use std::{
    cmp::Reverse,
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use time::OffsetDateTime;

#[derive(Debug)]
struct MemoryState {
    id_generator: ObjectIdGenerator,
    users: BTreeMap<Id<UserMarker>, UserCredentials>,
    posts: BTreeMap<Id<PostMarker>, PartialPost>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(id_generator: ObjectIdGenerator) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                id_generator,
                users: BTreeMap::new(),
                posts: BTreeMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    #[must_use]
    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ObjectIdGenerator::random())
    }
}

impl MemoryState {
    fn resolve(&self, post: &PartialPost) -> Option<Post> {
        let creator = self.users.get(&post.creator_id)?;

        Some(Post {
            id: post.id,
            creator: creator.user.clone(),
            content: post.content.clone(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }
}

impl Store for MemoryStore {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .get(&user_id)
            .map(|credentials| credentials.user.clone()))
    }

    async fn fetch_credentials(&self, email: &Email) -> Result<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|credentials| credentials.user.email == *email)
            .cloned())
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut state = self.lock();

        if state
            .users
            .values()
            .any(|credentials| credentials.user.email == user.email)
        {
            return Err(DbError::DuplicateEmail(user.email.get().to_owned()));
        }

        let created = User {
            id: state.id_generator.generate().into(),
            email: user.email.clone(),
            name: user.name.clone(),
            status: DEFAULT_STATUS.to_owned(),
            posts: Vec::new(),
        };
        state.users.insert(
            created.id,
            UserCredentials {
                user: created.clone(),
                password: user.password.clone(),
            },
        );

        Ok(created)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        if let Some(stored) = self.lock().users.get_mut(&user.id) {
            stored.user.status.clone_from(&user.status);
            stored.user.posts.clone_from(&user.posts);
        }

        Ok(())
    }

    async fn count_posts(&self) -> Result<u64> {
        Ok(self.lock().posts.len() as u64)
    }

    async fn fetch_posts(&self, offset: u64, limit: u64) -> Result<Vec<Post>> {
        let state = self.lock();

        let mut posts: Vec<&PartialPost> = state.posts.values().collect();
        posts.sort_by_key(|post| Reverse((post.created_at, post.id)));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(posts
            .into_iter()
            .filter_map(|post| state.resolve(post))
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.lock();
        Ok(state.posts.get(&post_id).and_then(|post| state.resolve(post)))
    }

    async fn fetch_partial_post(&self, post_id: Id<PostMarker>) -> Result<Option<PartialPost>> {
        Ok(self.lock().posts.get(&post_id).cloned())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut state = self.lock();

        if !state.users.contains_key(&post.creator) {
            return Err(DbError::MissingCreator(post.creator));
        }

        let now = OffsetDateTime::now_utc();
        let created = PartialPost {
            id: state.id_generator.generate_at(now).into(),
            creator_id: post.creator,
            content: post.content.clone(),
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(created.id, created.clone());

        state
            .resolve(&created)
            .ok_or(DbError::MissingCreator(post.creator))
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let mut state = self.lock();

        let Some(stored) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        stored.content = content.clone();
        stored.updated_at = stored.updated_at.max(OffsetDateTime::now_utc());

        let updated = stored.clone();
        Ok(state.resolve(&updated))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        Ok(self.lock().posts.remove(&post_id).is_some())
    }
}
