use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::{Pool, Sqlite};

use crate::{
    api::api_error::{ApiError, conflict_on_unique},
    db::user::{self, find_by_username_or_email, get_user_by_id},
    models::user::{
        ChangePasswordDto, LoginDto, NewUser, RegisterDto, Role, UpdateAccountDto, User,
    },
};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap();
}

const DUPLICATE_USER: &str = "User with email or username already exists";

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register(db: &Pool<Sqlite>, payload: &RegisterDto) -> Result<User, ApiError> {
    let fields = [
        &payload.full_name,
        &payload.email,
        &payload.username,
        &payload.password,
    ];
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }

    let email = payload.email.trim();
    if !EMAIL.is_match(email) {
        return Err(ApiError::BadRequest("Email address is not valid".into()));
    }

    let username = payload.username.trim().to_lowercase();
    create_account(
        db,
        payload.full_name.trim(),
        email,
        &username,
        &payload.password,
        Role::User,
    )
    .await
}

pub async fn create_account(
    db: &Pool<Sqlite>,
    full_name: &str,
    email: &str,
    username: &str,
    password: &str,
    role: Role,
) -> Result<User, ApiError> {
    let email = email.to_lowercase();
    let email = email.as_str();

    if find_by_username_or_email(db, Some(username), Some(email))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(DUPLICATE_USER.into()));
    }

    let password_hash = hash_password(password)?;
    let new_user = NewUser {
        full_name,
        email,
        username,
        password_hash: &password_hash,
        role,
    };

    // The UNIQUE constraints still catch a registration racing this one.
    user::create_user(db, &new_user)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_USER))
}

/// Checks login credentials and returns the matching user.
pub async fn authenticate(db: &Pool<Sqlite>, payload: &LoginDto) -> Result<User, ApiError> {
    let username = non_blank(payload.username.as_deref()).map(str::to_lowercase);
    let email = non_blank(payload.email.as_deref()).map(str::to_lowercase);

    if username.is_none() && email.is_none() {
        return Err(ApiError::BadRequest("username or email is required".into()));
    }

    let user = find_by_username_or_email(db, username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::info!(user_id = user.id, "failed login attempt");
        return Err(ApiError::Unauthorized("Invalid user credentials".into()));
    }

    Ok(user)
}

pub async fn change_password(
    db: &Pool<Sqlite>,
    user_id: i64,
    payload: &ChangePasswordDto,
) -> Result<(), ApiError> {
    if payload.new_password.trim().is_empty() {
        return Err(ApiError::BadRequest("New password is required".into()));
    }
    if payload.new_password != payload.confirm_password {
        return Err(ApiError::BadRequest("Passwords do not match".into()));
    }

    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(ApiError::BadRequest("Invalid password".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    user::update_user_password(db, user_id, &new_hash).await?;
    tracing::info!(user_id, "password changed");

    Ok(())
}

pub async fn update_account(
    db: &Pool<Sqlite>,
    user_id: i64,
    payload: &UpdateAccountDto,
) -> Result<User, ApiError> {
    let full_name = non_blank(payload.full_name.as_deref());
    let email = non_blank(payload.email.as_deref()).map(str::to_lowercase);

    if full_name.is_none() && email.is_none() {
        return Err(ApiError::BadRequest("At least one field is required".into()));
    }

    if let Some(email) = email.as_deref() {
        if !EMAIL.is_match(email) {
            return Err(ApiError::BadRequest("Email address is not valid".into()));
        }
        if let Some(owner) = find_by_username_or_email(db, None, Some(email)).await? {
            if owner.id != user_id {
                return Err(ApiError::Conflict("Email is already in use".into()));
            }
        }
    }

    user::update_account(db, user_id, full_name, email.as_deref())
        .await
        .map_err(|e| conflict_on_unique(e, "Email is already in use"))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory_pool, user::count_users};

    fn register_dto(username: &str, email: &str) -> RegisterDto {
        RegisterDto {
            full_name: "Grace Hopper".into(),
            email: email.into(),
            username: username.into(),
            password: "cobol-rules".into(),
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[tokio::test]
    async fn register_lowercases_username() {
        let db = init_memory_pool().await.unwrap();
        let user = register(&db, &register_dto("Grace", "grace@navy.mil"))
            .await
            .unwrap();

        assert_eq!(user.username, "grace");
        assert_eq!(user.role, Role::User);
        assert!(user.refresh_token.is_none());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_without_insert() {
        let db = init_memory_pool().await.unwrap();
        register(&db, &register_dto("grace", "grace@navy.mil"))
            .await
            .unwrap();

        let err = register(&db, &register_dto("GRACE", "other@navy.mil"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(count_users(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let db = init_memory_pool().await.unwrap();
        let mut dto = register_dto("grace", "grace@navy.mil");
        dto.full_name = "  ".into();

        assert!(matches!(
            register(&db, &dto).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            register(&db, &register_dto("grace", "not-an-email")).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_by_email_or_username() {
        let db = init_memory_pool().await.unwrap();
        register(&db, &register_dto("grace", "grace@navy.mil"))
            .await
            .unwrap();

        let by_email = LoginDto {
            username: None,
            email: Some("grace@navy.mil".into()),
            password: "cobol-rules".into(),
        };
        assert!(authenticate(&db, &by_email).await.is_ok());

        let wrong_password = LoginDto {
            username: Some("Grace".into()),
            email: None,
            password: "fortran".into(),
        };
        assert!(matches!(
            authenticate(&db, &wrong_password).await,
            Err(ApiError::Unauthorized(_))
        ));

        let unknown = LoginDto {
            username: Some("nobody".into()),
            email: None,
            password: "x".into(),
        };
        assert!(matches!(
            authenticate(&db, &unknown).await,
            Err(ApiError::NotFound(_))
        ));

        assert!(matches!(
            authenticate(&db, &LoginDto::default()).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn change_password_requires_current_one() {
        let db = init_memory_pool().await.unwrap();
        let user = register(&db, &register_dto("grace", "grace@navy.mil"))
            .await
            .unwrap();

        let bad = ChangePasswordDto {
            current_password: "wrong".into(),
            new_password: "next".into(),
            confirm_password: "next".into(),
        };
        assert!(matches!(
            change_password(&db, user.id, &bad).await,
            Err(ApiError::BadRequest(_))
        ));

        let mismatch = ChangePasswordDto {
            current_password: "cobol-rules".into(),
            new_password: "next".into(),
            confirm_password: "nxet".into(),
        };
        assert!(matches!(
            change_password(&db, user.id, &mismatch).await,
            Err(ApiError::BadRequest(_))
        ));

        let good = ChangePasswordDto {
            current_password: "cobol-rules".into(),
            new_password: "next".into(),
            confirm_password: "next".into(),
        };
        change_password(&db, user.id, &good).await.unwrap();

        let login = LoginDto {
            username: Some("grace".into()),
            email: None,
            password: "next".into(),
        };
        assert!(authenticate(&db, &login).await.is_ok());
    }

    #[tokio::test]
    async fn update_account_rejects_taken_email() {
        let db = init_memory_pool().await.unwrap();
        let grace = register(&db, &register_dto("grace", "grace@navy.mil"))
            .await
            .unwrap();
        register(&db, &register_dto("alan", "alan@bletchley.uk"))
            .await
            .unwrap();

        let taken = UpdateAccountDto {
            full_name: None,
            email: Some("alan@bletchley.uk".into()),
        };
        assert!(matches!(
            update_account(&db, grace.id, &taken).await,
            Err(ApiError::Conflict(_))
        ));

        let rename = UpdateAccountDto {
            full_name: Some("Rear Admiral Hopper".into()),
            email: None,
        };
        let updated = update_account(&db, grace.id, &rename).await.unwrap();
        assert_eq!(updated.full_name, "Rear Admiral Hopper");
        assert_eq!(updated.email, "grace@navy.mil");

        let shouted = UpdateAccountDto {
            full_name: None,
            email: Some("Alan@Bletchley.UK".into()),
        };
        assert!(matches!(
            update_account(&db, grace.id, &shouted).await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn emails_are_case_insensitive() {
        let db = init_memory_pool().await.unwrap();
        let grace = register(&db, &register_dto("grace", "Grace@Navy.mil"))
            .await
            .unwrap();
        assert_eq!(grace.email, "grace@navy.mil");

        let err = register(&db, &register_dto("hopper", "grace@navy.mil"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(count_users(&db).await.unwrap(), 1);

        let login = LoginDto {
            username: None,
            email: Some("GRACE@NAVY.MIL".into()),
            password: "cobol-rules".into(),
        };
        assert_eq!(authenticate(&db, &login).await.unwrap().id, grace.id);
    }
}
