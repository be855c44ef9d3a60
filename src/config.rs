use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Base URL of the relationship-verification capability.
    pub relationship_service_url: String,
    /// Base URL of the public-profile lookup capability.
    pub profile_service_url: String,
    /// Bound on the relationship-verification call; it gates a user-visible,
    /// retryable operation.
    pub relationship_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let relationship_service_url = env::var("RELATIONSHIP_SERVICE_URL")
            .unwrap_or_else(|_| "http://relationship-service:3000".into());
        let profile_service_url = env::var("PROFILE_SERVICE_URL")
            .unwrap_or_else(|_| "http://profile-service:3000".into());

        let relationship_timeout_secs: u64 = env::var("RELATIONSHIP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            relationship_service_url,
            profile_service_url,
            relationship_timeout: Duration::from_secs(relationship_timeout_secs),
        })
    }
}
