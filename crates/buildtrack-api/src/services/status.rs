//! Status callbacks from the CI runner.

use std::sync::Arc;

use buildtrack_core::config::WebhookAuth;
use buildtrack_core::validate::StatusUpdateRequest;
use buildtrack_core::{Build, Error, Result};
use buildtrack_db::{BuildRepo, DbError};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, info, warn};

/// Credentials presented with a callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// Plain shared secret (`x-webhook-secret`).
    pub secret: Option<&'a str>,
    /// `sha256=<hex>` HMAC of the body (`X-Hub-Signature-256`).
    pub signature: Option<&'a str>,
}

/// Applies authenticated status callbacks to build records.
pub struct StatusReceiver {
    repo: Arc<dyn BuildRepo>,
    auth: WebhookAuth,
}

impl StatusReceiver {
    pub fn new(repo: Arc<dyn BuildRepo>, auth: WebhookAuth) -> Self {
        Self { repo, auth }
    }

    /// Check credentials against the configured secret. Runs before the body
    /// is parsed or the store is touched.
    pub fn authenticate(&self, credentials: Credentials<'_>, body: &[u8]) -> Result<()> {
        let WebhookAuth::SharedSecret(secret) = &self.auth else {
            return Ok(());
        };

        let by_secret = credentials.secret.is_some_and(|s| secret.matches(s));
        let by_signature = !by_secret
            && verify_signature(secret.expose(), body, credentials.signature);

        if by_secret || by_signature {
            Ok(())
        } else {
            Err(Error::Unauthorized("Unauthorized".to_string()))
        }
    }

    /// Authenticate, validate and apply one callback; returns the stored row.
    pub async fn update_status(&self, credentials: Credentials<'_>, body: &[u8]) -> Result<Build> {
        self.authenticate(credentials, body).inspect_err(|_| {
            warn!("Rejected status callback with missing or invalid credentials");
        })?;

        let request: StatusUpdateRequest = serde_json::from_slice(body)
            .map_err(|e| Error::Validation(format!("Invalid JSON: {}", e)))?;
        let update = request.validate().inspect_err(|e| {
            warn!(build_id = ?request.build_id, error = %e, "Rejected status callback");
        })?;

        let build = self
            .repo
            .update(update.build_id, &update.patch, update.expected_status)
            .await
            .map_err(|e| {
                match &e {
                    DbError::NotFound(_) | DbError::Conflict(_) => {
                        warn!(build_id = %update.build_id, error = %e, "Status update not applied")
                    }
                    _ => error!(build_id = %update.build_id, error = %e, "Failed to update build"),
                }
                Error::from(e)
            })?;

        info!(
            build_id = %build.id,
            status = %build.status,
            stage = %build.stage,
            progress = build.progress,
            "Build status updated"
        );
        Ok(build)
    }
}

/// Verify a GitHub-style `sha256=<hex>` body signature.
fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature else {
        return false;
    };

    let Some(sig_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&sig_bytes).is_ok()
}
