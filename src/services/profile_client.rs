//! Public-identity lookup used to enrich chat listings. Display-only, so
//! every failure degrades to a placeholder instead of failing the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub user_id: Uuid,
    pub display_name: String,
}

impl PublicProfile {
    pub fn placeholder(user_id: Uuid) -> Self {
        Self {
            user_id,
            display_name: "Unknown user".into(),
        }
    }
}

pub struct ProfileClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProfileClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::StartServer(format!("profile client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn public_profile(&self, user_id: Uuid) -> PublicProfile {
        match self.fetch(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::debug!(%user_id, error = %e, "profile lookup failed, using placeholder");
                PublicProfile::placeholder(user_id)
            }
        }
    }

    async fn fetch(&self, user_id: Uuid) -> Result<PublicProfile, reqwest::Error> {
        let url = format!("{}/users/{}/profile", self.base_url, user_id);
        self.http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<PublicProfile>()
            .await
    }
}
