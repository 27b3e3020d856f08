use crate::{
    record::{CredentialsRecord, FullPostRecord, PartialPostRecord, UserRecord},
    store::{DbError, Result, Store},
};
use bulletin_common::{
    model::{
        Id,
        post::{CreatePost, PartialPost, Post, PostContent, PostMarker},
        user::{CreateUser, DEFAULT_STATUS, Email, User, UserCredentials, UserMarker},
    },
    object_id::{ObjectId, ObjectIdGenerator},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

pub const MAX_CONNECTIONS: u32 = 5;

const FULL_POST_COLUMNS: &str = "
    posts.post_id,
    posts.title,
    posts.content,
    posts.image_url,
    posts.created_at,
    posts.updated_at,
    users.user_id,
    users.email,
    users.name,
    users.status,
    users.post_ids
";

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    id_generator: Mutex<ObjectIdGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, id_generator: ObjectIdGenerator) -> Self {
        Self {
            pool,
            id_generator: Mutex::new(id_generator),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, ObjectIdGenerator::random()))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations are up to date");
        Ok(())
    }

    fn generate_id(&self) -> ObjectId {
        self.id_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }
}

fn bind_offset(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Store for DbClient {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.email,
                users.name,
                users.status,
                users.post_ids
            FROM
                users.users
            WHERE
                users.user_id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn fetch_credentials(&self, email: &Email) -> Result<Option<UserCredentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT
                users.user_id,
                users.email,
                users.name,
                users.status,
                users.post_ids,
                users.password_digest
            FROM
                users.users
            WHERE
                users.email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(UserCredentials::try_from).transpose()?;
        Ok(credentials)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let user_id = self.generate_id();

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (user_id, email, name, password_digest, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, email, name, status, post_ids
            ",
        )
        .bind(user_id.to_string())
        .bind(user.email.get())
        .bind(&user.name)
        .bind(user.password.get())
        .bind(DEFAULT_STATUS)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::DuplicateEmail(user.email.get().to_owned())
            }
            err => err.into(),
        })?;

        debug!(%user_id, "Inserted user");
        Ok(record.try_into()?)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let post_ids: Vec<String> = user.posts.iter().map(ToString::to_string).collect();

        query(
            "
            UPDATE users.users
            SET status = $2, post_ids = $3
            WHERE user_id = $1
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.status)
        .bind(post_ids)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_posts(&self) -> Result<u64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM posts.posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.cast_unsigned())
    }

    async fn fetch_posts(&self, offset: u64, limit: u64) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "
            SELECT {FULL_POST_COLUMNS}
            FROM
                posts.posts JOIN users.users ON users.user_id = posts.creator_id
            ORDER BY
                posts.created_at DESC, posts.post_id DESC
            OFFSET $1
            LIMIT $2
            "
        ))
        .bind(bind_offset(offset))
        .bind(bind_offset(limit))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "
            SELECT {FULL_POST_COLUMNS}
            FROM
                posts.posts JOIN users.users ON users.user_id = posts.creator_id
            WHERE
                posts.post_id = $1
            "
        ))
        .bind(post_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn fetch_partial_post(&self, post_id: Id<PostMarker>) -> Result<Option<PartialPost>> {
        let record = query_as::<_, PartialPostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.content,
                posts.image_url,
                posts.creator_id,
                posts.created_at,
                posts.updated_at
            FROM
                posts.posts
            WHERE
                posts.post_id = $1
            ",
        )
        .bind(post_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(PartialPost::try_from).transpose()?;
        Ok(post)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id = self.generate_id();

        let record = query_as::<_, FullPostRecord>(&format!(
            "
            WITH written AS (
                INSERT INTO posts.posts (post_id, title, content, image_url, creator_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {FULL_POST_COLUMNS}
            FROM
                written AS posts JOIN users.users ON users.user_id = posts.creator_id
            "
        ))
        .bind(post_id.to_string())
        .bind(&post.content.title)
        .bind(&post.content.content)
        .bind(post.content.image_url.as_deref())
        .bind(post.creator.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                DbError::MissingCreator(post.creator)
            }
            err => err.into(),
        })?
        .ok_or(DbError::MissingCreator(post.creator))?;

        debug!(%post_id, creator = %post.creator, "Inserted post");
        Ok(record.try_into()?)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "
            WITH written AS (
                UPDATE posts.posts
                SET
                    title = $2,
                    content = $3,
                    image_url = $4,
                    updated_at = GREATEST(now(), updated_at)
                WHERE post_id = $1
                RETURNING *
            )
            SELECT {FULL_POST_COLUMNS}
            FROM
                written AS posts JOIN users.users ON users.user_id = posts.creator_id
            "
        ))
        .bind(post_id.to_string())
        .bind(&content.title)
        .bind(&content.content)
        .bind(content.image_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_id = $1")
            .bind(post_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
