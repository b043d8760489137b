//! Account endpoints under `/user`.

use super::{ApiJson, ApiResult, AppState, AuthUser, extractors::SESSION_COOKIE, ok};
use crate::{
    core::{enrollment, user as users},
    entities::{subscription, user, user::Role},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `user` (default) or `seller`
    #[serde(default)]
    pub role: Option<Role>,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}")
}

/// `POST /user/register`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<user::Model> {
    let created = users::register(
        &state.db,
        users::NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role.unwrap_or(Role::User),
        },
    )
    .await?;
    Ok(ok(created))
}

/// `POST /user/login` - sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let ttl = state.settings.session_ttl_hours;
    let outcome = users::login(&state.db, &body.email, &body.password, ttl).await?;
    let cookie = session_cookie(&outcome.session.token, ttl.saturating_mul(3600));

    Ok((
        [(header::SET_COOKIE, cookie)],
        ok(json!({
            "user": outcome.user,
            "token": outcome.session.token,
            "expires_at": outcome.session.expires_at,
        })),
    ))
}

/// `POST /user/logout` - clears the session cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<impl IntoResponse> {
    users::logout(&state.db, &auth.token).await?;
    Ok((
        [(header::SET_COOKIE, session_cookie("", 0))],
        ok(json!({ "message": "Logged out" })),
    ))
}

/// `GET /user/me`
pub async fn me(auth: AuthUser) -> Json<super::ApiResponse<user::Model>> {
    ok(auth.user)
}

/// `GET /user/enrolled-courses`
pub async fn enrolled_courses(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Vec<enrollment::EnrolledCourse>> {
    Ok(ok(enrollment::enrolled_courses(&state.db, auth.user.id).await?))
}

/// `GET /user/subscriptions`
pub async fn subscriptions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Vec<subscription::Model>> {
    Ok(ok(enrollment::list_subscriptions(&state.db, auth.user.id).await?))
}

/// `DELETE /user/subscriptions/:id`
pub async fn cancel_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(subscription_id): Path<i64>,
) -> ApiResult<subscription::Model> {
    Ok(ok(
        enrollment::cancel_subscription(&state.db, auth.user.id, subscription_id).await?,
    ))
}

/// `GET /user/:id` - public profile.
pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Value> {
    let found = users::get_user(&state.db, user_id).await?;
    Ok(ok(json!({
        "id": found.id,
        "name": found.name,
        "role": found.role,
    })))
}
