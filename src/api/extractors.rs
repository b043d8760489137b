//! Request extractors: session identity and JSON bodies.
//!
//! The session token is read from the `token` cookie, falling back to an
//! `Authorization: Bearer` header for non-browser clients.

use super::AppState;
use crate::{
    core::user as users,
    entities::{user, user::Role},
    errors::{Error, Result},
};
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Raw session token from the cookie or bearer header.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

fn cookie_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        cookie_token(parts)
            .or_else(|| bearer_token(parts))
            .filter(|token| !token.is_empty())
            .map(Self)
            .ok_or_else(|| Error::unauthorized("Please log in to access this resource"))
    }
}

/// Any logged-in user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The authenticated user
    pub user: user::Model,
    /// The token that authenticated them
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;
        let user = users::authenticate(&state.db, &token).await?;
        Ok(Self { user, token })
    }
}

/// A logged-in seller or admin.
#[derive(Debug, Clone)]
pub struct SellerUser(pub user::Model);

#[async_trait]
impl FromRequestParts<AppState> for SellerUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Seller | Role::Admin => Ok(Self(user)),
            Role::User => Err(Error::forbidden("Seller account required")),
        }
    }
}

/// A logged-in admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        if user.role == Role::Admin {
            Ok(Self(user))
        } else {
            Err(Error::forbidden("Admin account required"))
        }
    }
}

/// `Json` that reports malformed bodies in the API error format.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_token_from_cookie() {
        let mut parts = parts(&[("cookie", "theme=dark; token=abc123; other=1")]);
        let token = SessionToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token.0, "abc123");
    }

    #[tokio::test]
    async fn test_token_from_bearer_header() {
        let mut parts = parts(&[("authorization", "Bearer xyz789")]);
        let token = SessionToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token.0, "xyz789");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let mut parts = parts(&[("cookie", "theme=dark")]);
        let result = SessionToken::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthorized { message: _ }));
    }
}
