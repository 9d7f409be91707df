//! Credential store
//!
//! All reads and writes against the `users` table live here. Username
//! uniqueness is case-sensitive at the storage layer (UNIQUE constraint);
//! the case-insensitive probes below implement the application-level rule
//! on top of it.

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

/// Durable user record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub uname: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
}

const USER_COLUMNS: &str = "id, uname, email, password_hash, created_at, updated_at, \
                            reset_token_hash, reset_token_expires_at";

pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Exact-match lookup; login is case-sensitive on the username.
pub async fn find_by_uname(pool: &PgPool, uname: &str) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE uname = $1"
    ))
    .bind(uname)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Registration-time conflict probe: exact match on either identity column.
pub async fn uname_or_email_exists(pool: &PgPool, uname: &str, email: &str) -> ApiResult<bool> {
    let row: Option<(bool,)> =
        sqlx::query_as("SELECT TRUE FROM users WHERE uname = $1 OR email = $2 LIMIT 1")
            .bind(uname)
            .bind(email)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// Case-insensitive username availability probe.
pub async fn uname_exists(pool: &PgPool, uname: &str) -> ApiResult<bool> {
    let row: Option<(bool,)> =
        sqlx::query_as("SELECT TRUE FROM users WHERE LOWER(uname) = LOWER($1) LIMIT 1")
            .bind(uname)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// Case-insensitive username probe excluding one user (rename conflict check).
pub async fn uname_taken_by_other(pool: &PgPool, uname: &str, user_id: Uuid) -> ApiResult<bool> {
    let row: Option<(bool,)> = sqlx::query_as(
        "SELECT TRUE FROM users WHERE LOWER(uname) = LOWER($1) AND id <> $2 LIMIT 1",
    )
    .bind(uname)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Exact-match email availability probe.
pub async fn email_exists(pool: &PgPool, email: &str) -> ApiResult<bool> {
    let row: Option<(bool,)> = sqlx::query_as("SELECT TRUE FROM users WHERE email = $1 LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

pub async fn insert_user(
    pool: &PgPool,
    uname: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (uname, email, password_hash) VALUES ($1, $2, $3) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(uname)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

pub async fn update_password(pool: &PgPool, user_id: Uuid, password_hash: &str) -> ApiResult<()> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn update_uname(pool: &PgPool, user_id: Uuid, uname: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET uname = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(uname)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_reset_token(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: OffsetDateTime,
) -> ApiResult<()> {
    sqlx::query(
        "UPDATE users SET reset_token_hash = $2, reset_token_expires_at = $3, \
         updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up a user by an unexpired reset token digest.
pub async fn find_by_live_reset_token(pool: &PgPool, token_hash: &str) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE reset_token_hash = $1 AND reset_token_expires_at > NOW()"
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Set the new password and clear the reset token in one statement, so the
/// token cannot be replayed after a successful reset.
pub async fn consume_reset_token(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> ApiResult<()> {
    sqlx::query(
        "UPDATE users SET password_hash = $2, reset_token_hash = NULL, \
         reset_token_expires_at = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(password_hash)
    .execute(pool)
    .await?;

    Ok(())
}

/// True when an insert failed on the uname/email UNIQUE constraints, i.e.
/// the storage layer resolved a check-then-write race against us.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
        .unwrap_or(false)
}

/// Minimal user projection returned to clients; never includes the hash.
#[derive(Debug, serde::Serialize)]
pub struct UserProjection {
    pub id: Uuid,
    pub uname: String,
    pub email: String,
}

impl From<&User> for UserProjection {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            uname: user.uname.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_omits_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            uname: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
            reset_token_hash: None,
            reset_token_expires_at: None,
        };

        let json = serde_json::to_value(UserProjection::from(&user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["uname"], "alice");
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
