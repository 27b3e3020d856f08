use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use bulletin_common::model::auth::{Identity, TokenKeys};
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use std::{convert::Infallible, sync::Arc};

/// Attaches the caller's [`Identity`] to every request.
///
/// Missing, malformed, expired or foreign tokens all leave the caller
/// anonymous. Rejecting them is up to the operations that need a user.
pub async fn resolve_identity(
    State(tokens): State<Arc<TokenKeys>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map_or(Identity::Anonymous, |authorization| {
            tokens.resolve(authorization.token())
        });

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// The identity resolved by [`resolve_identity`], anonymous if it never ran.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct RequestIdentity(pub Identity);

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().cloned().unwrap_or_default();
        Ok(Self(identity))
    }
}
