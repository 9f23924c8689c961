//! Inbound and outbound shapes of the itinerary flow

use serde::{Deserialize, Serialize};

use super::Destination;

/// Trip request accepted by the itinerary flow
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryFlowInput {
    /// Free-text trip request
    pub request: String,
    /// Inspiration images; only used when image description is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
}

impl ItineraryFlowInput {
    #[must_use]
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            image_urls: None,
        }
    }

    #[must_use]
    pub fn with_images(mut self, image_urls: Vec<String>) -> Self {
        self.image_urls = Some(image_urls);
        self
    }
}

/// Itineraries in retrieval order, never containing a missing entry
pub type ItineraryFlowOutput = Vec<Destination>;
