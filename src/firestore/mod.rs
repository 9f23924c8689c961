//! Firestore REST access for the places and activities collections

pub mod activities;
pub mod places;
pub mod value;

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::CompassClient;

pub use activities::FirestoreActivityCatalog;
pub use places::FirestorePlacesRetriever;

/// Document as returned by `runQuery`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FirestoreDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl FirestoreDocument {
    /// Last path segment of the document name
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// Document fields as plain JSON
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        value::fields_to_json(&self.fields)
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Clone)]
pub struct FirestoreClient {
    client: Arc<CompassClient>,
}

impl FirestoreClient {
    pub fn new(client: Arc<CompassClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CompassClient {
        &self.client
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents:runQuery",
            self.client.firestore_base_url().trim_end_matches('/'),
            self.client.project_id(),
            self.client.config().firestore.database
        )
    }

    /// Run a structured query and return the matched documents in order
    pub async fn run_query(&self, structured_query: Value) -> Result<Vec<FirestoreDocument>> {
        let body = serde_json::json!({ "structuredQuery": structured_query });
        let items: Vec<RunQueryItem> = self
            .client
            .post_json("Firestore", &self.run_query_url(), &body)
            .await?;

        // progress-only entries carry no document
        let documents: Vec<FirestoreDocument> =
            items.into_iter().filter_map(|item| item.document).collect();
        debug!("Firestore query matched {} document(s)", documents.len());
        Ok(documents)
    }
}
