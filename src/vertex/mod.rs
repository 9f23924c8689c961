//! Vertex AI client: Gemini content generation and text embeddings

pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::{CompassError, client::CompassClient};
use types::{EmbedInstance, EmbedRequest, EmbedResponse, GenerateContentRequest, GenerateContentResponse};

pub use types::{Content, GenerationConfig, Part};

/// Task type used when embedding retrieval queries
const RETRIEVAL_QUERY: &str = "RETRIEVAL_QUERY";

#[derive(Debug, Clone)]
pub struct VertexAi {
    client: Arc<CompassClient>,
}

impl VertexAi {
    pub fn new(client: Arc<CompassClient>) -> Self {
        Self { client }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.client.vertex_base_url().trim_end_matches('/'),
            self.client.project_id(),
            self.client.location(),
            model,
            method
        )
    }

    #[instrument(skip(self, request))]
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.model_url(model, "generateContent");
        let response: GenerateContentResponse =
            self.client.post_json("Vertex AI", &url, request).await?;
        debug!(
            "Gemini returned {} candidate(s), finish reason {:?}",
            response.candidates.len(),
            response.finish_reason()
        );
        Ok(response)
    }

    /// Embed a retrieval query with the configured embedding model
    #[instrument(skip(self, text))]
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f64>> {
        let model = &self.client.config().vertex.embedding_model;
        let url = self.model_url(model, "predict");
        let request = EmbedRequest {
            instances: vec![EmbedInstance {
                content: text.to_string(),
                task_type: RETRIEVAL_QUERY.to_string(),
            }],
        };

        let response: EmbedResponse = self.client.post_json("Vertex AI", &url, &request).await?;
        let values = response
            .predictions
            .into_iter()
            .next()
            .map(|p| p.embeddings.values)
            .ok_or_else(|| CompassError::api("Vertex AI returned no embedding"))?;

        debug!("Embedded query into {} dimensions", values.len());
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::TokenSource, config::CompassConfig};

    #[test]
    fn test_model_url() {
        let mut config = CompassConfig::default();
        config.firebase.project_id = "compass-test".to_string();
        config.vertex.location = "europe-west1".to_string();
        let client =
            CompassClient::with_token_source(config, TokenSource::Static("t".to_string())).unwrap();
        let vertex = VertexAi::new(Arc::new(client));
        assert_eq!(
            vertex.model_url("gemini-1.5-flash", "generateContent"),
            "https://europe-west1-aiplatform.googleapis.com/v1/projects/compass-test/locations/europe-west1/publishers/google/models/gemini-1.5-flash:generateContent"
        );
    }
}
