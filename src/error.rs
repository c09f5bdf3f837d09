use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::error;

use crate::response::Meta;

/// Every failure a handler can report. Rendered into the response envelope by
/// the single `IntoResponse` impl below.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("duplicate value for field '{field}'")]
    Duplicate { field: String },

    #[error("email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. }
            | ApiError::Duplicate { .. }
            | ApiError::DuplicateEmail
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation { field, message } => {
                let mut errors = Map::new();
                errors.insert(field, Value::String(message));
                json!({
                    "meta": Meta::new(status, "Invalid data"),
                    "errors": errors,
                })
            }
            ApiError::Duplicate { field } => json!({
                "meta": Meta::new(
                    status,
                    format!("Value for field '{field}' already exists. Please use another value."),
                ),
            }),
            ApiError::DuplicateEmail => json!({ "meta": Meta::new(status, "Email already registered") }),
            ApiError::BadRequest(msg) => json!({ "meta": Meta::new(status, msg) }),
            ApiError::Unauthorized(msg) | ApiError::NotFound(msg) => json!({
                "meta": Meta::new(status, msg),
                "data": null,
            }),
            ApiError::Internal(e) => {
                error!(error = ?e, "internal error");
                json!({ "meta": Meta::new(status, "Internal server error") })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Failures surfaced by the record stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate value for field '{field}'")]
    Duplicate { field: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a unique-index violation to `Duplicate`, naming the column from
    /// the constraint (`users_email_key` -> `email`).
    pub fn from_sqlx(table: &str, e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = db
                    .constraint()
                    .map(|c| field_from_constraint(table, c))
                    .unwrap_or_else(|| "unknown".into());
                return StoreError::Duplicate { field };
            }
        }
        StoreError::Database(e)
    }
}

pub(crate) fn field_from_constraint(table: &str, constraint: &str) -> String {
    let rest = constraint
        .strip_prefix(table)
        .and_then(|s| s.strip_prefix('_'))
        .unwrap_or(constraint);
    rest.strip_suffix("_key").unwrap_or(rest).to_string()
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { field } => ApiError::Duplicate { field },
            StoreError::Database(e) => ApiError::Internal(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn validation_error_is_keyed_by_field() {
        let (status, body) =
            body_json(ApiError::validation("email", "Invalid email format")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["meta"]["status"], 400);
        assert_eq!(body["errors"]["email"], "Invalid email format");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_403() {
        let (status, body) = body_json(ApiError::unauthorized("User not found")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["meta"]["message"], "User not found");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("connection refused"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["meta"]["message"], "Internal server error");
        assert!(!body.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn duplicate_names_the_field() {
        let (status, body) = body_json(StoreError::Duplicate { field: "username".into() }.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["meta"]["message"]
            .as_str()
            .unwrap()
            .contains("'username'"));
    }

    #[test]
    fn constraint_names_resolve_to_columns() {
        assert_eq!(field_from_constraint("users", "users_email_key"), "email");
        assert_eq!(field_from_constraint("users", "users_username_key"), "username");
        assert_eq!(field_from_constraint("categories", "categories_slug_key"), "slug");
        assert_eq!(field_from_constraint("users", "custom"), "custom");
    }
}
