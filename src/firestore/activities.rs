use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use super::{FirestoreClient, FirestoreDocument};
use crate::{models::Activity, retriever::ActivityCatalog};

/// Activities stored in Firestore, keyed by their owning place
#[derive(Debug, Clone)]
pub struct FirestoreActivityCatalog {
    firestore: FirestoreClient,
    collection: String,
    destination_field: String,
    limit: u32,
}

impl FirestoreActivityCatalog {
    pub fn new(firestore: FirestoreClient) -> Self {
        let config = &firestore.client().config().firestore;
        Self {
            collection: config.activities_collection.clone(),
            destination_field: config.activity_destination_field.clone(),
            limit: config.activity_limit,
            firestore,
        }
    }

    fn destination_query(&self, place_ref: &str) -> Value {
        json!({
            "from": [{ "collectionId": self.collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": self.destination_field },
                    "op": "EQUAL",
                    "value": { "stringValue": place_ref }
                }
            },
            "limit": self.limit
        })
    }
}

fn to_activity(document: &FirestoreDocument) -> Option<Activity> {
    let mut fields = document.to_json();
    fields
        .entry("ref")
        .or_insert_with(|| Value::String(document.id().to_string()));

    match serde_json::from_value::<Activity>(Value::Object(fields)) {
        Ok(activity) => Some(activity),
        Err(e) => {
            warn!("Skipping malformed activity {}: {}", document.id(), e);
            None
        }
    }
}

#[async_trait]
impl ActivityCatalog for FirestoreActivityCatalog {
    #[instrument(skip(self))]
    async fn activities_for_destination(&self, place_ref: &str) -> Result<Vec<Activity>> {
        let documents = self
            .firestore
            .run_query(self.destination_query(place_ref))
            .await?;
        Ok(documents.iter().filter_map(to_activity).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::TokenSource, client::CompassClient, config::CompassConfig};
    use std::sync::Arc;

    fn document(id: &str, fields: Value) -> FirestoreDocument {
        FirestoreDocument {
            name: format!("projects/p/databases/(default)/documents/activities/{id}"),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_destination_query_is_bounded() {
        let mut config = CompassConfig::default();
        config.firebase.project_id = "compass-test".to_string();
        config.firestore.activity_limit = 7;
        let client =
            CompassClient::with_token_source(config, TokenSource::Static("t".to_string())).unwrap();
        let catalog = FirestoreActivityCatalog::new(FirestoreClient::new(Arc::new(client)));

        let query = catalog.destination_query("p1");
        assert_eq!(query["from"][0]["collectionId"], "activities");
        assert_eq!(query["where"]["fieldFilter"]["field"]["fieldPath"], "destination");
        assert_eq!(query["where"]["fieldFilter"]["value"]["stringValue"], "p1");
        assert_eq!(query["limit"], 7);
    }

    #[test]
    fn test_activity_conversion_uses_document_id() {
        let activity = to_activity(&document(
            "a1",
            json!({
                "name": { "stringValue": "Old town walk" },
                "description": { "stringValue": "Guided tour" },
                "destination": { "stringValue": "p1" }
            }),
        ))
        .unwrap();
        assert_eq!(activity.reference.as_deref(), Some("a1"));
        assert_eq!(activity.name, "Old town walk");
        assert!(activity.image_url.is_none());
    }

    #[test]
    fn test_malformed_activity_is_skipped() {
        assert!(to_activity(&document("a2", json!({ "name": { "stringValue": "No description" } }))).is_none());
    }
}
