//! Session cookie parsing and `Set-Cookie` construction.

use axum::http::{header, HeaderMap};
use time::{format_description::FormatItem, macros::format_description, Duration, OffsetDateTime};

/// Cookie carrying the session JWT.
pub const SESSION_COOKIE_NAME: &str = "token";

const HTTP_DATE: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a freshly issued session token.
pub fn session_cookie(token: &str, days: i64, secure: bool, now: OffsetDateTime) -> String {
    let max_age = Duration::days(days);
    let expires = (now + max_age)
        .to_offset(time::UtcOffset::UTC)
        .format(HTTP_DATE)
        .unwrap_or_default();
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; Expires={}{}",
        SESSION_COOKIE_NAME,
        token,
        max_age.whole_seconds(),
        expires,
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn cleared_cookie(secure: bool) -> String {
    format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT{}",
        SESSION_COOKIE_NAME,
        if secure { "; Secure" } else { "" }
    )
}
