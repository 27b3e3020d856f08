//! GraphQL surface of the content service.

use crate::{
    server::AppService,
    service::{PostInput, UserInput, error::ServiceError},
};
use async_graphql::{
    Context, EmptySubscription, Error as GraphQlError, ErrorExtensions, ID, InputObject, Object,
    Result as GraphQlResult, Schema, SimpleObject, Value,
};
use bulletin_common::model::{auth::Identity, post::Post, user::User};
use serde::Serialize;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, error};

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[must_use]
pub fn build_schema(service: Arc<AppService>) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

fn reject(err: ServiceError) -> GraphQlError {
    if err.is_internal() {
        error!(error = %err, "Operation failed");
    } else {
        debug!(error = %err, status = err.status(), "Operation rejected");
    }

    let status = err.status();
    let details = err.details().to_vec();

    GraphQlError::new(err.client_message()).extend_with(|_, extensions| {
        extensions.set("status", i32::from(status));
        if !details.is_empty()
            && let Some(data) = serde_json::to_value(&details)
                .ok()
                .and_then(|json| Value::from_json(json).ok())
        {
            extensions.set("data", data);
        }
    })
}

fn iso_8601(time: OffsetDateTime) -> GraphQlResult<String> {
    Ok(time.format(&Rfc3339)?)
}

fn context<'ctx>(ctx: &Context<'ctx>) -> GraphQlResult<(&'ctx AppService, &'ctx Identity)> {
    let service = ctx.data::<Arc<AppService>>()?;
    let identity = ctx.data::<Identity>()?;
    Ok((service.as_ref(), identity))
}

pub struct UserObject(User);

#[Object(name = "User")]
impl UserObject {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> &str {
        self.0.email.get()
    }

    async fn status(&self) -> &str {
        &self.0.status
    }

    /// Ids of the posts this user created.
    async fn posts(&self) -> Vec<ID> {
        self.0
            .posts
            .iter()
            .map(|post_id| ID(post_id.to_string()))
            .collect()
    }
}

pub struct PostObject(Post);

#[Object(name = "Post")]
impl PostObject {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn title(&self) -> &str {
        &self.0.content.title
    }

    async fn content(&self) -> &str {
        &self.0.content.content
    }

    async fn image_url(&self) -> Option<&str> {
        self.0.content.image_url.as_deref()
    }

    async fn creator(&self) -> UserObject {
        UserObject(self.0.creator.clone())
    }

    async fn created_at(&self) -> GraphQlResult<String> {
        iso_8601(self.0.created_at)
    }

    async fn updated_at(&self) -> GraphQlResult<String> {
        iso_8601(self.0.updated_at)
    }
}

#[derive(SimpleObject)]
pub struct AuthData {
    token: String,
    user_id: ID,
}

#[derive(SimpleObject)]
pub struct PostData {
    posts: Vec<PostObject>,
    total_posts: i32,
}

#[derive(InputObject)]
pub struct UserInputData {
    email: String,
    name: String,
    password: String,
}

#[derive(InputObject)]
pub struct PostInputData {
    title: String,
    content: String,
    image_url: Option<String>,
}

impl From<UserInputData> for UserInput {
    fn from(value: UserInputData) -> Self {
        Self {
            email: value.email,
            name: value.name,
            password: value.password,
        }
    }
}

impl From<PostInputData> for PostInput {
    fn from(value: PostInputData) -> Self {
        Self {
            title: value.title,
            content: value.content,
            image_url: value.image_url,
        }
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GraphQlResult<AuthData> {
        let (service, _) = context(ctx)?;
        let auth = service.login(&email, password).await.map_err(reject)?;

        Ok(AuthData {
            token: auth.token,
            user_id: ID(auth.user_id.to_string()),
        })
    }

    async fn posts(&self, ctx: &Context<'_>, page: Option<i32>) -> GraphQlResult<PostData> {
        let (service, identity) = context(ctx)?;
        let page = service.list_posts(identity, page).await.map_err(reject)?;

        Ok(PostData {
            posts: page.posts.into_iter().map(PostObject).collect(),
            total_posts: i32::try_from(page.total_posts).unwrap_or(i32::MAX),
        })
    }

    async fn post(&self, ctx: &Context<'_>, post_id: ID) -> GraphQlResult<PostObject> {
        let (service, identity) = context(ctx)?;
        let post = service
            .get_post(identity, post_id.as_str())
            .await
            .map_err(reject)?;

        Ok(PostObject(post))
    }

    async fn user(&self, ctx: &Context<'_>) -> GraphQlResult<UserObject> {
        let (service, identity) = context(ctx)?;
        let user = service.current_user(identity).await.map_err(reject)?;

        Ok(UserObject(user))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        user_input: UserInputData,
    ) -> GraphQlResult<UserObject> {
        let (service, _) = context(ctx)?;
        let user = service
            .register(user_input.into())
            .await
            .map_err(reject)?;

        Ok(UserObject(user))
    }

    async fn create_post(
        &self,
        ctx: &Context<'_>,
        post_input: PostInputData,
    ) -> GraphQlResult<PostObject> {
        let (service, identity) = context(ctx)?;
        let post = service
            .create_post(identity, post_input.into())
            .await
            .map_err(reject)?;

        Ok(PostObject(post))
    }

    async fn update_post(
        &self,
        ctx: &Context<'_>,
        post_id: ID,
        post_input: PostInputData,
    ) -> GraphQlResult<PostObject> {
        let (service, identity) = context(ctx)?;
        let post = service
            .update_post(identity, post_id.as_str(), post_input.into())
            .await
            .map_err(reject)?;

        Ok(PostObject(post))
    }

    async fn delete_post(&self, ctx: &Context<'_>, post_id: ID) -> GraphQlResult<bool> {
        let (service, identity) = context(ctx)?;
        service
            .delete_post(identity, post_id.as_str())
            .await
            .map_err(reject)
    }

    async fn update_status(&self, ctx: &Context<'_>, status: String) -> GraphQlResult<UserObject> {
        let (service, identity) = context(ctx)?;
        let user = service
            .update_status(identity, status)
            .await
            .map_err(reject)?;

        Ok(UserObject(user))
    }
}

/// GraphQL error as sent to clients. Errors raised before any operation ran,
/// such as parse or validation failures, carry no status.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct GraphQlResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorEnvelope>,
}

impl From<async_graphql::ServerError> for ErrorEnvelope {
    fn from(value: async_graphql::ServerError) -> Self {
        let mut extensions = value
            .extensions
            .as_ref()
            .and_then(|extensions| serde_json::to_value(extensions).ok());

        let status = extensions
            .as_ref()
            .and_then(|extensions| extensions.get("status"))
            .and_then(serde_json::Value::as_u64)
            .and_then(|status| u16::try_from(status).ok());
        let data = extensions
            .as_mut()
            .and_then(|extensions| extensions.get_mut("data"))
            .map(serde_json::Value::take);

        Self {
            message: value.message,
            status,
            data,
        }
    }
}

impl From<async_graphql::Response> for GraphQlResponse {
    fn from(value: async_graphql::Response) -> Self {
        Self {
            data: value.data,
            errors: value.errors.into_iter().map(ErrorEnvelope::from).collect(),
        }
    }
}
