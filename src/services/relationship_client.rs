//! Client for the platform's relationship-verification capability.
//!
//! The capability gates chat creation, so its failure modes matter: a
//! timeout or a non-2xx response is `ServiceUnavailable` (retryable), never
//! `false`. The caller decides nothing on an unavailable dependency.

use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct RelationshipResponse {
    active: bool,
}

pub struct RelationshipClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelationshipClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::StartServer(format!("relationship client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Whether an active collaborative relationship exists between the two
    /// users. `Ok(false)` means the capability answered "no"; every failure
    /// to get an answer is `Err(ServiceUnavailable)`.
    pub async fn verify(&self, user_a: Uuid, user_b: Uuid) -> AppResult<bool> {
        let url = format!("{}/relationships/verify", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("user_a", user_a.to_string()),
                ("user_b", user_b.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "relationship verification unreachable");
                AppError::ServiceUnavailable("relationship verification unreachable".into())
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                "relationship verification returned non-success"
            );
            return Err(AppError::ServiceUnavailable(
                "relationship verification failed".into(),
            ));
        }

        let body: RelationshipResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "relationship verification returned invalid body");
            AppError::ServiceUnavailable("relationship verification returned invalid body".into())
        })?;

        Ok(body.active)
    }
}
