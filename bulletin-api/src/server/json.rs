use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::FromRequest,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;

#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => (TypedHeader(ContentType::json()), body).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::json::Json;
    use axum::{
        http::{StatusCode, header},
        response::IntoResponse,
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn serializes_with_json_content_type() {
        let response = Json(json!({ "message": "File stored" })).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"message":"File stored"}"#);
    }

    #[test]
    fn unserializable_values_become_internal_errors() {
        // Maps with non-string keys cannot be written as JSON objects.
        let map = BTreeMap::from([((1, 2), "pair")]);
        let response = Json(map).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
