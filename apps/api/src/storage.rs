use aws_sdk_s3::primitives::ByteStream;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::state::AppState;

/// Folders admins may upload images into.
pub const UPLOAD_FOLDERS: &[&str] = &[
    "hero-images",
    "gallery-images",
    "member-photos",
    "news-images",
    "event-images",
    "program-icons",
];

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub bucket: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

/// Writes an object to the configured bucket.
pub async fn put_object(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: &str,
) -> Result<(), AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;

    info!("Stored s3://{}/{}", bucket, key);
    Ok(())
}

/// Public URL of an object under the configured public base.
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Maps an image MIME type to the file extension used in the object key.
///
/// Any `image/<subtype>` with a plain alphanumeric subtype is accepted and
/// keyed by that subtype (`bmp`, `tiff`, `heic`, ...). SVG is refused: it can
/// carry script and objects are served straight from the public bucket.
pub fn image_extension(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.strip_prefix("image/")? {
        "jpeg" | "jpg" | "pjpeg" => "jpg",
        "x-icon" | "vnd.microsoft.icon" => "ico",
        "svg+xml" => return None,
        subtype if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric()) => {
            subtype
        }
        _ => return None,
    };
    Some(ext.to_string())
}

/// Checks an upload and returns the object key it should be stored under.
pub fn plan_upload(
    folder: &str,
    content_type: &str,
    size: usize,
    max_bytes: usize,
) -> Result<String, AppError> {
    if !UPLOAD_FOLDERS.contains(&folder) {
        return Err(AppError::Validation(format!(
            "Unknown upload bucket '{folder}'; expected one of {}",
            UPLOAD_FOLDERS.join(", ")
        )));
    }
    let ext = image_extension(content_type).ok_or_else(|| {
        AppError::Validation(format!("Only image uploads are accepted, got '{content_type}'"))
    })?;
    if size == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if size > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {size} bytes; the limit is {max_bytes} bytes"
        )));
    }
    Ok(format!("{folder}/{}.{ext}", Uuid::new_v4()))
}

/// POST /api/v1/admin/uploads?bucket=<folder>
pub async fn handle_upload(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut file: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(format!("Upload exceeds the size limit: {e}"))
            } else {
                AppError::Validation(format!("Could not read upload: {e}"))
            }
        })?;
        file = Some((content_type, data));
        break;
    }

    let (content_type, data) =
        file.ok_or_else(|| AppError::Validation("Multipart field 'file' is required".into()))?;
    let key = plan_upload(
        &query.bucket,
        &content_type,
        data.len(),
        state.config.max_upload_bytes,
    )?;
    let size = data.len();

    put_object(
        &state.s3,
        &state.config.s3_bucket,
        &key,
        data.to_vec(),
        &content_type,
    )
    .await?;
    info!("Admin {} uploaded {key} ({size} bytes)", admin.user_id);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: public_url(&state.config.s3_public_url, &key),
            key,
            content_type,
            size,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_upload_builds_key_under_folder() {
        let key = plan_upload("gallery-images", "image/png", 10, 100).unwrap();
        assert!(key.starts_with("gallery-images/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_plan_upload_rejects_non_images() {
        let err = plan_upload("gallery-images", "application/pdf", 10, 100).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_plan_upload_rejects_unknown_folder() {
        let err = plan_upload("secrets", "image/png", 10, 100).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_plan_upload_enforces_size_limits() {
        assert!(matches!(
            plan_upload("hero-images", "image/jpeg", 0, 100).unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            plan_upload("hero-images", "image/jpeg", 101, 100).unwrap_err(),
            AppError::PayloadTooLarge(_)
        ));
        assert!(plan_upload("hero-images", "image/jpeg", 100, 100).is_ok());
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("http://cdn.example/bucket/", "hero-images/a.png"),
            "http://cdn.example/bucket/hero-images/a.png"
        );
    }

    #[test]
    fn test_image_extension_is_case_insensitive() {
        assert_eq!(image_extension("IMAGE/JPEG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("text/plain"), None);
    }

    #[test]
    fn test_image_extension_accepts_any_raster_subtype() {
        for (content_type, ext) in [
            ("image/bmp", "bmp"),
            ("image/tiff", "tiff"),
            ("image/heic", "heic"),
            ("image/avif", "avif"),
            ("image/png; charset=binary", "png"),
            ("image/vnd.microsoft.icon", "ico"),
        ] {
            assert_eq!(image_extension(content_type).as_deref(), Some(ext), "{content_type}");
        }
    }

    #[test]
    fn test_svg_and_odd_subtypes_are_refused() {
        assert_eq!(image_extension("image/svg+xml"), None);
        assert_eq!(image_extension("IMAGE/SVG+XML"), None);
        assert_eq!(image_extension("image/"), None);
        assert_eq!(image_extension("image/../x"), None);
        assert_eq!(image_extension("application/octet-stream"), None);
        assert!(plan_upload("hero-images", "image/svg+xml", 100, 1000).is_err());
        assert!(plan_upload("hero-images", "image/heic", 100, 1000).is_ok());
    }
}
