//! Access/refresh token issuing and renewal.
//!
//! Access tokens are short lived and carried on every protected request.
//! Refresh tokens live longer and only mint new access tokens. Each user
//! has at most one live refresh token, mirrored on the `users` row: a token
//! that no longer matches that column is dead even if its signature and
//! expiry still check out. Renewal does not rotate the refresh token.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use sqlx::{Pool, Sqlite};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::Config,
    db::user::{get_user_by_id, set_refresh_token},
    models::user::{Claims, User},
};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired. Please log in again.")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Signing(jsonwebtoken::errors::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The presented access token is still good; nothing was minted.
    StillValid,
    Renewed(String),
}

pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        TokenService {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl,
            refresh_ttl,
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.access_token_secret.as_bytes(),
            config.refresh_token_secret.as_bytes(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn sign_access_token(&self, user: &User) -> Result<String, TokenError> {
        sign(user, self.access_ttl, &self.access_encoding)
    }

    fn sign_refresh_token(&self, user: &User) -> Result<String, TokenError> {
        sign(user, self.refresh_ttl, &self.refresh_encoding)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, &self.access_decoding)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, &self.refresh_decoding)
    }

    fn verify(&self, token: &str, key: &DecodingKey) -> Result<Claims, TokenError> {
        decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Signs both tokens and stores the refresh token on the user row,
    /// replacing whatever was there.
    pub async fn issue_token_pair(
        &self,
        db: &Pool<Sqlite>,
        user: &User,
    ) -> Result<TokenPair, TokenError> {
        let access_token = self.sign_access_token(user)?;
        let refresh_token = self.sign_refresh_token(user)?;

        set_refresh_token(db, user.id, Some(&refresh_token)).await?;
        tracing::debug!(user_id = user.id, "issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub async fn rotate_on_refresh(
        &self,
        db: &Pool<Sqlite>,
        incoming_refresh: Option<&str>,
        current_access: Option<&str>,
    ) -> Result<RefreshOutcome, TokenError> {
        let incoming = incoming_refresh
            .filter(|token| !token.is_empty())
            .ok_or(TokenError::Unauthorized("Unauthorized request"))?;

        let claims = self.validate_refresh_token(incoming).inspect_err(|e| {
            if matches!(e, TokenError::Invalid) {
                tracing::warn!("rejected malformed or forged refresh token");
            }
        })?;

        let user = get_user_by_id(db, claims.sub)
            .await?
            .ok_or(TokenError::Unauthorized("Invalid refresh token"))?;

        if user.refresh_token.as_deref() != Some(incoming) {
            tracing::warn!(user_id = user.id, "refresh token does not match stored token");
            return Err(TokenError::Unauthorized(
                "Refresh token is expired or does not match",
            ));
        }

        if let Some(access) = current_access {
            if let Ok(access_claims) = self.validate_access_token(access) {
                if access_claims.sub == user.id {
                    return Ok(RefreshOutcome::StillValid);
                }
            }
        }

        let access_token = self.sign_access_token(&user)?;
        tracing::debug!(user_id = user.id, "renewed access token");
        Ok(RefreshOutcome::Renewed(access_token))
    }

    pub async fn revoke(&self, db: &Pool<Sqlite>, user_id: i64) -> Result<(), TokenError> {
        set_refresh_token(db, user_id, None).await?;
        tracing::debug!(user_id, "revoked refresh token");
        Ok(())
    }
}

fn sign(user: &User, ttl: Duration, key: &EncodingKey) -> Result<String, TokenError> {
    let now = Utc::now();
    let exp = now + ttl;

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        iat: now.timestamp().max(0) as usize,
        exp: exp.timestamp().max(0) as usize,
        jti: Uuid::new_v4().to_string(),
    };

    encode(&Header::default(), &claims, key).map_err(TokenError::Signing)
}
