use crate::models::user::{NewUser, Role, User};

use chrono::Utc;
use sqlx::{Pool, Result, Sqlite};

const USER_COLUMNS: &str =
    "id, full_name, email, username, password_hash, role, refresh_token, created_at";

pub async fn create_user(db: &Pool<Sqlite>, new_user: &NewUser<'_>) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (full_name, email, username, password_hash, role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(new_user.full_name)
    .bind(new_user.email)
    .bind(new_user.username)
    .bind(new_user.password_hash)
    .bind(new_user.role)
    .bind(Utc::now())
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn get_user_by_id(db: &Pool<Sqlite>, user_id: i64) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn get_user_by_username(db: &Pool<Sqlite>, username: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(db)
    .await
}

/// Matches on either identifier; a `None` side never matches.
pub async fn find_by_username_or_email(
    db: &Pool<Sqlite>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE username = $1 OR email = $2
        ORDER BY id
        LIMIT 1
        "#
    ))
    .bind(username)
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn count_users(db: &Pool<Sqlite>) -> Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
}

pub async fn admin_exists(db: &Pool<Sqlite>) -> Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(Role::Admin)
        .fetch_one(db)
        .await
}

/// Overwrites the stored refresh token. `None` revokes it.
pub async fn set_refresh_token(
    db: &Pool<Sqlite>,
    user_id: i64,
    refresh_token: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET refresh_token = $1
        WHERE id = $2
        "#,
    )
    .bind(refresh_token)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn update_user_password(db: &Pool<Sqlite>, user_id: i64, new_hash: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $1
        WHERE id = $2
        "#,
    )
    .bind(new_hash)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn update_account(
    db: &Pool<Sqlite>,
    user_id: i64,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET full_name = COALESCE($1, full_name),
            email = COALESCE($2, email)
        WHERE id = $3
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(full_name)
    .bind(email)
    .bind(user_id)
    .fetch_optional(db)
    .await
}
