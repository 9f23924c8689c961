//! Content store collaborators used by the itinerary flow

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Activity, RetrievedDocument};

/// Similarity search over the places collection
#[async_trait]
pub trait PlacesRetriever: Send + Sync {
    /// Return at most `limit` documents, most relevant first
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>>;
}

/// Lookup of the activities offered at a place
#[async_trait]
pub trait ActivityCatalog: Send + Sync {
    /// Bounded list of activities for the place with the given ref
    async fn activities_for_destination(&self, place_ref: &str) -> Result<Vec<Activity>>;
}
