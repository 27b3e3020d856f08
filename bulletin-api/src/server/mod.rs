use crate::{
    service::ContentService,
    storage::{DiskImageStorage, IMAGE_URL_PREFIX},
};
use axum::{
    Router,
    extract::{FromRef, Request, multipart::MultipartError, rejection::JsonRejection},
    http::{HeaderName, Method, StatusCode, Uri, header},
    middleware,
    response::{IntoResponse, Response},
};
use bulletin_common::model::auth::TokenKeys;
use bulletin_db::backend::StoreBackend;
use json::Json;
use schema::AppSchema;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, error};

mod auth;
mod json;
mod routes;
pub mod schema;


pub type AppService = ContentService<StoreBackend, DiskImageStorage>;

pub type ServerRouter = Router<ServerState>;

const ALLOWED_METHODS: [Method; 6] = [
    Method::OPTIONS,
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];
const ALLOWED_HEADERS: [HeaderName; 2] = [header::CONTENT_TYPE, header::AUTHORIZATION];

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub schema: AppSchema,
    pub tokens: Arc<TokenKeys>,
    pub images: DiskImageStorage,
}

impl ServerState {
    #[must_use]
    pub fn new(service: AppService, images: DiskImageStorage) -> Self {
        let tokens = Arc::new(service.tokens().clone());
        let schema = schema::build_schema(Arc::new(service));

        Self {
            schema,
            tokens,
            images,
        }
    }
}

/// The complete application: routes, identity resolution, CORS, static images
/// and request tracing.
pub fn app(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS);

    routes::routes()
        .nest_service(
            &format!("/{IMAGE_URL_PREFIX}"),
            ServeDir::new(state.images.root()),
        )
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_identity,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Multipart body could not be read: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Not authenticated!")]
    NotAuthenticated,
    #[error("Image could not be stored: {0}")]
    StoreImage(std::io::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(rejection) => rejection.status(),
            ServerError::Multipart(err) => err.status(),
            ServerError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ServerError::JsonResponse(_) | ServerError::StoreImage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    message: String,
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
            "An error occurred".to_owned()
        } else {
            debug!(error = %self, %status, "Replying with error");
            self.to_string()
        };

        let error_response = ErrorResponse {
            message,
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
