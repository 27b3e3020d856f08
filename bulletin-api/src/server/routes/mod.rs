use crate::server::ServerRouter;
use axum::Router;

mod graphql;
mod images;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(graphql::routes())
        .merge(images::routes())
}
