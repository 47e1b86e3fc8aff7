use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Session cookie, scoped to the whole site.
pub(super) fn session_cookie(
    name: &str,
    session_id: &str,
    ttl_secs: u64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX)))
        .build()
}

/// Removal cookie for the session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
