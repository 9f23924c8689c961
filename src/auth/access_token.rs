use std::{
    env,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use tokio::{process::Command, sync::Mutex};

use crate::CompassError;

/// gcloud tokens live for an hour; refresh well before that.
const TOKEN_LIFETIME: Duration = Duration::from_secs(50 * 60);

/// Where bearer tokens for Google APIs come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    /// Fixed token from config or `GOOGLE_CLOUD_ACCESS_TOKEN`
    Static(String),
    /// `gcloud auth print-access-token`, cached between calls
    Gcloud,
}

impl TokenSource {
    /// Pick the token source: configured token, then the environment, then gcloud.
    pub fn resolve(configured: Option<&str>) -> Self {
        let non_blank = |t: &String| !t.trim().is_empty();
        configured
            .map(str::to_string)
            .filter(non_blank)
            .or_else(|| env::var("GOOGLE_CLOUD_ACCESS_TOKEN").ok().filter(non_blank))
            .map_or(TokenSource::Gcloud, TokenSource::Static)
    }
}

#[derive(Debug, Clone)]
struct StoredToken {
    access_token: String,
    expiry: Instant,
}

/// Hands out bearer tokens for Vertex AI and Firestore calls.
#[derive(Debug)]
pub struct AccessTokenProvider {
    source: TokenSource,
    stored_token: Mutex<Option<StoredToken>>,
}

impl AccessTokenProvider {
    pub fn new(source: TokenSource) -> Self {
        Self {
            source,
            stored_token: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String> {
        match &self.source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Gcloud => {
                let mut stored = self.stored_token.lock().await;
                if let Some(token) = stored.as_ref() {
                    if token.expiry > Instant::now() {
                        return Ok(token.access_token.clone());
                    }
                    tracing::debug!("Cached access token expired, refreshing");
                }

                let access_token = print_access_token().await?;
                *stored = Some(StoredToken {
                    access_token: access_token.clone(),
                    expiry: Instant::now() + TOKEN_LIFETIME,
                });
                Ok(access_token)
            }
        }
    }
}

async fn print_access_token() -> Result<String> {
    tracing::debug!("Requesting access token from gcloud");
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .context("Failed to run gcloud")?;

    if !output.status.success() {
        return Err(CompassError::auth(format!(
            "gcloud command failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))
        .into());
    }

    let token = String::from_utf8(output.stdout)
        .context("Invalid UTF-8 in gcloud token")?
        .trim()
        .to_string();

    if token.is_empty() {
        return Err(CompassError::auth("gcloud returned an empty access token").into());
    }
    Ok(token)
}
