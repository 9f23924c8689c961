use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{FirestoreClient, FirestoreDocument, value::vector_value};
use crate::{
    models::{DocumentPart, RetrievedDocument},
    retriever::PlacesRetriever,
    vertex::VertexAi,
};

/// Vector search over the places collection.
///
/// The query is embedded with Vertex AI and matched against the vector field
/// with cosine distance.
#[derive(Debug, Clone)]
pub struct FirestorePlacesRetriever {
    firestore: FirestoreClient,
    vertex: VertexAi,
    collection: String,
    vector_field: String,
    content_field: String,
}

impl FirestorePlacesRetriever {
    pub fn new(firestore: FirestoreClient, vertex: VertexAi) -> Self {
        let config = &firestore.client().config().firestore;
        Self {
            collection: config.places_collection.clone(),
            vector_field: config.vector_field.clone(),
            content_field: config.content_field.clone(),
            firestore,
            vertex,
        }
    }

    fn nearest_query(&self, vector: &[f64], limit: usize) -> Value {
        json!({
            "from": [{ "collectionId": self.collection }],
            "findNearest": {
                "vectorField": { "fieldPath": self.vector_field },
                "queryVector": vector_value(vector),
                "distanceMeasure": "COSINE",
                "limit": limit
            }
        })
    }

    /// Content comes from the content field; metadata is everything else
    /// minus the vector field. The document id stands in for a missing `ref`.
    fn to_retrieved(&self, document: &FirestoreDocument) -> RetrievedDocument {
        let mut metadata = document.to_json();
        metadata.remove(&self.vector_field);
        let content = match metadata.remove(&self.content_field) {
            Some(Value::String(text)) => vec![DocumentPart::text(text)],
            _ => Vec::new(),
        };
        metadata
            .entry("ref")
            .or_insert_with(|| Value::String(document.id().to_string()));

        RetrievedDocument { content, metadata }
    }
}

#[async_trait]
impl PlacesRetriever for FirestorePlacesRetriever {
    #[instrument(skip(self, query), fields(collection = %self.collection))]
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>> {
        let vector = self.vertex.embed_query(query).await?;
        let documents = self
            .firestore
            .run_query(self.nearest_query(&vector, limit))
            .await?;

        debug!("Retrieved {} place document(s)", documents.len());
        Ok(documents.iter().map(|d| self.to_retrieved(d)).collect())
    }
}
