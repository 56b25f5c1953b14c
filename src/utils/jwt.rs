// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Role carried by tokens issued at login.
pub const ROLE_USER: &str = "user";

/// Role carried by tokens issued to guests when they join a session.
/// The subject of a guest token is the taker id, not a user id.
pub const ROLE_GUEST: &str = "guest";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// User ID for `user` tokens, quiz taker ID for `guest` tokens.
    pub sub: String,
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// ID of the registered user behind this token. Guests are rejected.
    pub fn user_id(&self) -> Result<i64, AppError> {
        if self.role == ROLE_GUEST {
            return Err(AppError::AuthError(
                "A registered account is required".to_string(),
            ));
        }
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    /// Taker ID bound to a guest token.
    pub fn guest_taker_id(&self) -> Option<i64> {
        (self.role == ROLE_GUEST)
            .then(|| self.sub.parse::<i64>().ok())
            .flatten()
    }
}

/// Claims of the caller on routes where authentication is optional.
#[derive(Debug, Clone, Default)]
pub struct MaybeClaims(pub Option<Claims>);

impl MaybeClaims {
    /// Registered user ID, if the caller is a logged in user.
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().and_then(|c| c.user_id().ok())
    }

    pub fn guest_taker_id(&self) -> Option<i64> {
        self.0.as_ref().and_then(Claims::guest_taker_id)
    }
}

/// Signs a new JWT.
///
/// Arguments:
/// * `subject`: User ID or, for guests, taker ID.
/// * `role`: [`ROLE_USER`] or [`ROLE_GUEST`].
pub fn sign_jwt(
    subject: i64,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects `Claims`
/// into the request extensions. Missing or invalid tokens get 401.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: Optional Authentication.
///
/// Always injects [`MaybeClaims`]. Anonymous requests pass through; a token
/// that is present but invalid is still rejected with 401.
pub async fn optional_auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = match bearer_token(&req) {
        Some(token) => Some(
            verify_jwt(token, &config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?,
        ),
        None => None,
    };

    req.extensions_mut().insert(MaybeClaims(claims));
    Ok(next.run(req).await)
}
