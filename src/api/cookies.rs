use axum::http::{HeaderMap, header};
use chrono::Duration;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; {}",
        name,
        value,
        max_age.num_seconds().max(0),
        same_site(secure)
    )
}

pub fn clear_cookie(name: &str, secure: bool) -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; {}", name, same_site(secure))
}

// Browsers drop SameSite=None cookies that are not Secure.
fn same_site(secure: bool) -> &'static str {
    if secure {
        "Secure; SameSite=None"
    } else {
        "SameSite=Lax"
    }
}
