//! The uniform `{ meta, data }` envelope and the small request helpers that go
//! with it.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct Meta {
    pub status: u16,
    pub message: String,
}

impl Meta {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// `200 { meta, data }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            meta: Meta::new(StatusCode::OK, message),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub current: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: &PageQuery) -> Self {
        let limit = page.limit();
        Self {
            total,
            current: page.page(),
            total_pages: total / limit + i64::from(total % limit != 0),
        }
    }
}

/// `200 { meta, data, pagination }`
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub meta: Meta,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> Paginated<T> {
    pub fn ok(data: Vec<T>, pagination: Pagination, message: impl Into<String>) -> Self {
        Self {
            meta: Meta::new(StatusCode::OK, message),
            data,
            pagination,
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// `?page=&limit=&search=` on listing routes. Values that do not parse as a
/// positive integer fall back to the defaults instead of rejecting the request;
/// `limit` is capped at `MAX_LIMIT`.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        positive(self.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    /// Saturates for absurd pages; the store then returns an empty page.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0)
}

/// Parses a `:id` path segment. A malformed id is reported exactly like a
/// missing record.
pub fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(not_found))
}

/// `Json<T>` whose rejection is rendered through `ApiError` so malformed
/// bodies get the same envelope as every other failure.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::bad_request(json_rejection_message(&rejection))),
        }
    }
}

fn json_rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "Expected a JSON request body".into(),
        other => other.body_text(),
    }
}
