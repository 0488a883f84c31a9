use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_cookies::Cookies;

pub const AUTH_COOKIE: &str = "smarttrip_user";

/// Caller id from `Authorization: Bearer <id>`. The gateway in front of
/// this service validates the credential and forwards the resolved id.
fn bearer_user_id(headers: &HeaderMap) -> Option<i32> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    token.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

pub async fn auth_middleware(cookies: Cookies, mut request: Request, next: Next) -> Response {
    let user_id = bearer_user_id(request.headers()).or_else(|| {
        cookies
            .get(AUTH_COOKIE)
            .and_then(|cookie| cookie.value().parse::<i32>().ok())
            .filter(|id| *id > 0)
    });

    match user_id {
        Some(user_id) => {
            tracing::Span::current().record("user_id", user_id);
            request.extensions_mut().insert(user_id);
            next.run(request).await
        }
        None => (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response(),
    }
}
