use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

const TOO_LARGE: &str = "File too large. Max 2MB.";
const NOT_AN_IMAGE: &str = "Only image files (JPEG, JPG, PNG) are allowed!";

/// One uploaded file, already checked for size and type.
#[derive(Debug)]
pub struct UploadItem {
    pub field: String,
    pub ext: &'static str,
    pub content_type: String,
    pub body: Bytes,
}

/// Text fields of a multipart form plus the single file field, if sent.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub file: Option<UploadItem>,
}

impl UploadForm {
    /// Trimmed text value; `None` when absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.trim().to_string())
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            file: None,
        }
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request(TOO_LARGE)
    } else {
        ApiError::bad_request(e.body_text())
    }
}

/// Reads the whole form. Only `file_field` may carry a file; its size and
/// type are checked here so nothing invalid ever reaches storage.
pub async fn read_form(mut mp: Multipart, file_field: &str) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let body = field.bytes().await.map_err(multipart_error)?;
            if file_name.is_empty() && body.is_empty() {
                continue;
            }
            let ext = check_image(&file_name, &content_type, body.len())?;
            form.file = Some(UploadItem {
                field: name,
                ext,
                content_type,
                body,
            });
        } else if field.file_name().is_some() {
            return Err(ApiError::bad_request(format!("Unexpected file field '{name}'")));
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

/// Both the file extension and the declared MIME type must be jpeg/jpg/png.
fn check_image(file_name: &str, content_type: &str, size: usize) -> Result<&'static str, ApiError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::bad_request(TOO_LARGE));
    }
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| match ext.as_str() {
            "jpg" => Some("jpg"),
            "jpeg" => Some("jpeg"),
            "png" => Some("png"),
            _ => None,
        });
    match (ext, ext_from_mime(content_type)) {
        (Some(ext), Some(_)) => Ok(ext),
        _ => Err(ApiError::bad_request(NOT_AN_IMAGE)),
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// `<field>-<unix millis>-<short id>.<ext>` under `images/`.
fn object_key(item: &UploadItem) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let short = Uuid::new_v4().simple().to_string();
    format!("images/{}-{}-{}.{}", item.field, millis, &short[..8], item.ext)
}

/// Stores the file and returns the public URL recorded on the document.
pub async fn store_image(st: &AppState, item: UploadItem) -> Result<String, ApiError> {
    let key = object_key(&item);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await?;
    info!(%key, "image stored");
    Ok(format!("{}/{}", st.config.base_url, key))
}

fn key_from_url<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(base_url)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
}

/// Best-effort removal of a stored image. Failures are logged and swallowed;
/// the caller's operation still succeeds.
pub async fn remove_image(st: &AppState, url: &str) {
    let Some(key) = key_from_url(&st.config.base_url, url) else {
        warn!(%url, "image url is not under BASE_URL; leaving file in place");
        return;
    };
    match st.storage.delete_object(key).await {
        Ok(()) => info!(%key, "image removed"),
        Err(e) => warn!(error = %e, %key, "failed to remove image"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn image_checks() {
        assert_eq!(check_image("a.PNG", "image/png", 10).unwrap(), "png");
        assert_eq!(check_image("photo.jpeg", "image/jpeg", 10).unwrap(), "jpeg");
        assert!(check_image("a.gif", "image/gif", 10).is_err());
        assert!(check_image("a.png", "text/plain", 10).is_err());
        assert!(check_image("noext", "image/png", 10).is_err());

        let err = check_image("a.png", "image/png", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == TOO_LARGE));
    }

    #[test]
    fn keys_carry_field_and_extension() {
        let key = object_key(&UploadItem {
            field: "icon".into(),
            ext: "png",
            content_type: "image/png".into(),
            body: Bytes::new(),
        });
        assert!(key.starts_with("images/icon-"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn urls_map_back_to_keys() {
        let base = "http://localhost:9495/public";
        assert_eq!(
            key_from_url(base, "http://localhost:9495/public/images/a.png"),
            Some("images/a.png")
        );
        assert_eq!(key_from_url(base, "https://elsewhere/images/a.png"), None);
        assert_eq!(key_from_url(base, base), None);
    }
}
