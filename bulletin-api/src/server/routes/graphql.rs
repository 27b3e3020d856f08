use crate::server::{
    ServerRouter, ServerState,
    auth::RequestIdentity,
    json::Json,
    schema::{AppSchema, GraphQlResponse},
};
use async_graphql::http::GraphiQLSource;
use axum::{Router, extract::State, response::Html};
use axum_extra::routing::{RouterExt, TypedPath};

pub fn routes() -> ServerRouter {
    Router::new().typed_get(explorer).typed_post(execute)
}

#[derive(TypedPath)]
#[typed_path("/graphql")]
struct GraphQlPath;

async fn explorer(_: GraphQlPath) -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

#[axum::debug_handler(state = ServerState)]
async fn execute(
    _: GraphQlPath,
    State(schema): State<AppSchema>,
    RequestIdentity(identity): RequestIdentity,
    Json(request): Json<async_graphql::Request>,
) -> Json<GraphQlResponse> {
    let response = schema.execute(request.data(identity)).await;

    Json(response.into())
}
