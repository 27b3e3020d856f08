use crate::{
    server::{Result, ServerError, ServerRouter, auth::RequestIdentity, json::Json},
    storage::{DiskImageStorage, ImageStorage, is_accepted_image_type},
};
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Serialize;
use tracing::{debug, info};

const IMAGE_FIELD: &str = "image";
const OLD_PATH_FIELD: &str = "oldPath";

/// Uploads are not size limited.
pub fn routes() -> ServerRouter {
    Router::new()
        .typed_put(upload_image)
        .layer(DefaultBodyLimit::disable())
}

#[derive(TypedPath)]
#[typed_path("/post-image")]
struct PostImagePath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
}

struct Upload {
    file_name: String,
    bytes: Bytes,
}

#[derive(Default)]
struct UploadForm {
    image: Option<Upload>,
    old_path: Option<String>,
}

/// Reads the form. Files of other types and any image after the first are
/// skipped as if they had not been sent.
async fn read_form(multipart: &mut Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let content_type = field.content_type().map(str::to_owned);
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;

                if !content_type.as_deref().is_some_and(is_accepted_image_type) {
                    debug!(?content_type, %file_name, "Skipping file with unaccepted type");
                } else if form.image.is_some() {
                    debug!(%file_name, "Skipping additional image");
                } else {
                    form.image = Some(Upload { file_name, bytes });
                }
            }
            Some(OLD_PATH_FIELD) => form.old_path = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn upload_image(
    _: PostImagePath,
    State(images): State<DiskImageStorage>,
    RequestIdentity(identity): RequestIdentity,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    if !identity.is_authenticated() {
        return Err(ServerError::NotAuthenticated);
    }

    let form = read_form(&mut multipart).await?;

    let Some(image) = form.image else {
        let response = UploadResponse {
            message: "No file provided",
            file_path: None,
        };
        return Ok((StatusCode::OK, Json(response)));
    };

    let file_path = images
        .store(&image.bytes, &image.file_name)
        .await
        .map_err(ServerError::StoreImage)?;

    if let Some(old_path) = form.old_path.filter(|old_path| !old_path.is_empty()) {
        images.delete(&old_path).await;
    }

    info!(%file_path, "Stored uploaded image");
    let response = UploadResponse {
        message: "File stored",
        file_path: Some(file_path),
    };
    Ok((StatusCode::CREATED, Json(response)))
}
