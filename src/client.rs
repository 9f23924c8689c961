//! Long-lived client handle shared by every flow invocation
//!
//! The handle is built once at process start from [`CompassConfig`] and is
//! read-only afterwards. It owns the outbound HTTP client (timeouts and
//! transport retries live here), the access token source, and the list of
//! enabled capability plugins.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
    CompassError,
    auth::{AccessTokenProvider, TokenSource},
    config::CompassConfig,
};

/// Capability plugins enabled on the client handle
#[derive(Debug, Clone, PartialEq)]
pub enum Plugin {
    /// Gemini generation and text embeddings
    VertexAi { project_id: String, location: String },
    /// Span and log export tagged with the Firebase project
    FirebaseTelemetry { project_id: String },
}

impl Plugin {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Plugin::VertexAi { .. } => "vertexai",
            Plugin::FirebaseTelemetry { .. } => "firebase-telemetry",
        }
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::VertexAi {
                project_id,
                location,
            } => write!(f, "{} ({project_id}, {location})", self.name()),
            Plugin::FirebaseTelemetry { project_id } => {
                write!(f, "{} ({project_id})", self.name())
            }
        }
    }
}

pub struct CompassClient {
    config: CompassConfig,
    plugins: Vec<Plugin>,
    http: ClientWithMiddleware,
    tokens: AccessTokenProvider,
}

impl CompassClient {
    /// Build the handle, resolving the token source from config and environment
    pub fn new(config: CompassConfig) -> Result<Self> {
        let source = TokenSource::resolve(config.http.access_token.as_deref());
        Self::with_token_source(config, source)
    }

    pub fn with_token_source(config: CompassConfig, source: TokenSource) -> Result<Self> {
        config.validate_project()?;

        let timeout = Duration::from_secs(config.http.timeout_seconds.into());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Compass/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.http.max_retries);
        let http = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let mut plugins = vec![Plugin::VertexAi {
            project_id: config.firebase.project_id.clone(),
            location: config.vertex.location.clone(),
        }];
        if config.telemetry.enabled {
            plugins.push(Plugin::FirebaseTelemetry {
                project_id: config.firebase.project_id.clone(),
            });
        }

        Ok(Self {
            config,
            plugins,
            http,
            tokens: AccessTokenProvider::new(source),
        })
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.config.firebase.project_id
    }

    /// Region of the generation backend
    #[must_use]
    pub fn location(&self) -> &str {
        &self.config.vertex.location
    }

    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    #[must_use]
    pub fn config(&self) -> &CompassConfig {
        &self.config
    }

    #[must_use]
    pub fn vertex_base_url(&self) -> String {
        self.config.vertex.base_url.clone().unwrap_or_else(|| {
            format!("https://{}-aiplatform.googleapis.com", self.location())
        })
    }

    #[must_use]
    pub fn firestore_base_url(&self) -> String {
        self.config
            .firestore
            .base_url
            .clone()
            .unwrap_or_else(|| "https://firestore.googleapis.com".to_string())
    }

    /// POST a JSON body to a Google API and decode the JSON response.
    #[instrument(level = "debug", skip(self, body))]
    pub async fn post_json<B, R>(&self, service: &str, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = self.tokens.token().await?;
        let payload = serde_json::to_vec(body)
            .with_context(|| format!("Failed to encode {service} request"))?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| CompassError::api(format!("{service} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CompassError::from_status(service, status.as_u16(), &error_text).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CompassError::api(format!("{service} response could not be read: {e}")))?;
        debug!("{} responded with {} bytes", service, bytes.len());

        serde_json::from_slice(&bytes).map_err(|e| {
            CompassError::api(format!("Failed to parse {service} response: {e}")).into()
        })
    }
}

impl fmt::Debug for CompassClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompassClient")
            .field("project_id", &self.project_id())
            .field("location", &self.location())
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CompassConfig {
        let mut config = CompassConfig::default();
        config.firebase.project_id = "compass-test".to_string();
        config
    }

    fn client(config: CompassConfig) -> CompassClient {
        CompassClient::with_token_source(config, TokenSource::Static("token".to_string()))
            .unwrap()
    }

    #[test]
    fn test_requires_project_id() {
        let result = CompassClient::with_token_source(
            CompassConfig::default(),
            TokenSource::Static("token".to_string()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_vertex_plugin_always_enabled() {
        let client = client(config());
        assert_eq!(
            client.plugins(),
            &[Plugin::VertexAi {
                project_id: "compass-test".to_string(),
                location: "us-central1".to_string(),
            }]
        );
    }

    #[test]
    fn test_telemetry_plugin_follows_config() {
        let mut config = config();
        config.telemetry.enabled = true;
        let client = client(config);
        let names: Vec<_> = client.plugins().iter().map(Plugin::name).collect();
        assert_eq!(names, vec!["vertexai", "firebase-telemetry"]);
    }

    #[test]
    fn test_base_urls() {
        let client = client(config());
        assert_eq!(
            client.vertex_base_url(),
            "https://us-central1-aiplatform.googleapis.com"
        );
        assert_eq!(client.firestore_base_url(), "https://firestore.googleapis.com");

        let mut overridden = config();
        overridden.vertex.base_url = Some("http://localhost:9000".to_string());
        assert_eq!(self::client(overridden).vertex_base_url(), "http://localhost:9000");
    }
}
