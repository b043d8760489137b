//! User business logic - Registration, credentials and sessions.
//!
//! Passwords are hashed with Argon2id. Sessions are opaque random tokens with
//! an expiry; the HTTP layer carries them in the `token` cookie.

use crate::{
    entities::{Session, User, session, user, user::Role},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Input for [`register`].
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plain-text password, hashed before storage
    pub password: String,
    /// Requested role; `Admin` cannot be self-assigned
    pub role: Role,
}

/// A freshly issued session together with its owner.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The authenticated user
    pub user: user::Model,
    /// The session that identifies them
    pub session: session::Model,
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes()).map_err(|e| {
        Error::Config {
            message: format!("Failed to build password salt: {e}"),
        }
    })?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Config {
            message: format!("Failed to hash password: {e}"),
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Creates a new account after validating the input.
#[instrument(skip(db, input), fields(email = %input.email))]
pub async fn register(db: &DatabaseConnection, input: NewUser) -> Result<user::Model> {
    let name = input.name.trim();
    let email = input.email.trim().to_lowercase();

    if name.is_empty() {
        return Err(Error::validation("Name cannot be empty"));
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(Error::validation("Email address is invalid"));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if input.role == Role::Admin {
        return Err(Error::forbidden("Admin accounts cannot be self-registered"));
    }

    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::conflict("Email is already registered"));
    }

    let model = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email),
        password_hash: Set(hash_password(&input.password)?),
        role: Set(input.role),
        earnings: Set(0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(user_id = created.id, role = ?created.role, "Registered user");
    Ok(created)
}

/// Inserts a user with an explicit role, bypassing the self-registration rules.
/// Used for bootstrapping administrators.
pub async fn create_user_with_role(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<user::Model> {
    let model = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.trim().to_lowercase()),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        earnings: Set(0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Creates the administrator account unless a user with that email exists.
///
/// Returns `true` when an account was created.
pub async fn ensure_admin(db: &DatabaseConnection, email: &str, password: &str) -> Result<bool> {
    if get_user_by_email(db, email).await?.is_some() {
        debug!(email, "Administrator already present");
        return Ok(false);
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::Config {
            message: format!("ADMIN_PASSWORD must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    let admin = create_user_with_role(db, "Administrator", email, password, Role::Admin).await?;
    info!(user_id = admin.id, "Created administrator account");
    Ok(true)
}

/// Looks up a user by email (case-insensitive).
pub async fn get_user_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Lists all users, oldest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Verifies credentials and opens a session valid for `ttl_hours`.
#[instrument(skip(db, password))]
pub async fn login(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> Result<LoginOutcome> {
    let invalid = || Error::unauthorized("Invalid email or password");

    let user = get_user_by_email(db, email).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password_hash) {
        return Err(invalid());
    }

    let now = Utc::now();
    let expires_at = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::Config {
            message: format!("Session lifetime of {ttl_hours} hours is out of range"),
        })?;
    let session = session::ActiveModel {
        token: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user.id),
        created_at: Set(now),
        expires_at: Set(expires_at),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, "User logged in");
    Ok(LoginOutcome { user, session })
}

/// Ends a session. Unknown tokens are ignored.
pub async fn logout(db: &DatabaseConnection, token: &str) -> Result<()> {
    Session::delete_many()
        .filter(session::Column::Token.eq(token))
        .exec(db)
        .await?;
    Ok(())
}

/// Resolves a session token to its user. Expired sessions are removed.
pub async fn authenticate(db: &DatabaseConnection, token: &str) -> Result<user::Model> {
    let session = Session::find()
        .filter(session::Column::Token.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| Error::unauthorized("Session not found"))?;

    if session.expires_at <= Utc::now() {
        debug!(session_id = session.id, "Rejecting expired session");
        session.delete(db).await?;
        return Err(Error::unauthorized("Session expired"));
    }

    User::find_by_id(session.user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::unauthorized("Session user no longer exists"))
}
