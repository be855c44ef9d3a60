//! Identity verification for the HTTP surface and the WebSocket handshake.
//!
//! Tokens are platform-issued JWTs validated against the shared secret. The
//! claim schema is explicit: a token missing `sub` or `role` does not
//! validate, and no alternate claim names are consulted.

use std::future::Future;
use std::pin::Pin;

use actix_web::{web, Error, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    /// Platform role (e.g. "professional", "client"); informational here,
    /// authorization is per-chat.
    pub role: String,
    /// Expiry, seconds since epoch.
    pub exp: usize,
}

/// Validate a bearer token. Expired, malformed and wrong-signature tokens
/// all map to `Unauthorized`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// Extract the bearer token from the Authorization header, if present.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Authenticated caller of a synchronous API request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or(AppError::Internal)?;
            let token = token.ok_or(AppError::Unauthorized)?;
            let claims = verify_jwt(&token, &state.config.jwt_secret)?;
            Ok(AuthUser {
                id: claims.sub,
                role: claims.role,
            })
        })
    }
}
