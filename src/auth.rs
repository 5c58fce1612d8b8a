use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;
use crate::response::{ok, Envelope};
use crate::stores::UserStore;
use crate::users::{NewUser, User};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct Claims {
    sub: Uuid,
    exp: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

fn issue_token(user_id: Uuid) -> AppResult<String> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Message("clock overflow".into()))?
        .timestamp() as usize;
    let claims = Claims { sub: user_id, exp };
    let secret = crate::config::JWT_SECRET.as_str();
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(?e, "Token encoding error");
        AppError::Message("Token error".into())
    })
}

fn auth_cookie(token: &str) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        format!("auth_token={token}; HttpOnly; Secure; SameSite=Strict; Path=/")
            .parse()
            .map_err(|_| AppError::Message("Cookie error".into()))?,
    );
    Ok(headers)
}

pub async fn register_user(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(HeaderMap, Json<Envelope<AuthResponse>>)> {
    let email = payload.email.trim().to_ascii_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Name required".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::Validation("Password too short".into()));
    }

    if users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Validation(
            "User already exists with this email".into(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Message(format!("Hashing failed: {}", e)))?;

    let user = match users
        .create(NewUser {
            email,
            name: payload.name.trim().to_string(),
            password_hash: hash.to_string(),
        })
        .await
    {
        Ok(user) => user,
        Err(AppError::Db(e)) => {
            if let sqlx::Error::Database(db_err) = &e {
                // Racing registration for the same address.
                if db_err.constraint() == Some("users_email_key") {
                    return Err(AppError::Validation(
                        "User already exists with this email".into(),
                    ));
                }
            }
            return Err(AppError::Db(e));
        }
        Err(e) => return Err(e),
    };

    let token = issue_token(user.id)?;
    let headers = auth_cookie(&token)?;
    Ok((headers, ok(AuthResponse { user, token })))
}

pub async fn login_user(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<Envelope<AuthResponse>>)> {
    let email = payload.email.trim().to_ascii_lowercase();
    let user = users
        .find_by_email(&email)
        .await
        .map_err(|e| {
            error!(?e, "store error while fetching user");
            e
        })?
        .ok_or(AppError::Unauthorized)?;

    let parsed = PasswordHash::new(&user.password_hash).map_err(|e| {
        error!(?e, "Hash parse error");
        AppError::Message(format!("Hash error: {}", e))
    })?;
    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(AppError::Unauthorized);
    }

    let token = issue_token(user.id)?;
    let headers = auth_cookie(&token)?;
    Ok((headers, ok(AuthResponse { user, token })))
}

pub async fn logout_user() -> AppResult<(HeaderMap, Json<Envelope<serde_json::Value>>)> {
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        "auth_token=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0"
            .parse()
            .map_err(|_| AppError::Message("Cookie error".into()))?,
    );
    Ok((headers, ok(serde_json::json!({ "message": "Logged out" }))))
}

pub async fn current_user(
    Extension(users): Extension<Arc<dyn UserStore>>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<Envelope<User>>> {
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(ok(user))
}
