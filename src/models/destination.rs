//! Generated itinerary model

use serde::{Deserialize, Serialize};

use super::Place;

/// Itinerary generated for one place
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Name of the place the itinerary is for
    pub place: String,
    pub itinerary_name: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Day by day plan
    pub itinerary: Vec<ItineraryDay>,
    /// Copied from the source place after generation
    #[serde(default)]
    pub itinerary_image_url: String,
    /// Ref of the source place, for traceability
    #[serde(default)]
    pub place_ref: String,
}

/// One day of an itinerary
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day: u32,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub plan_title: String,
    #[serde(default)]
    pub activities: Vec<ItineraryActivity>,
}

/// Activity slot within a day
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryActivity {
    #[serde(rename = "ref", default)]
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

impl Destination {
    /// Overwrite the traceability fields from the originating place,
    /// whatever the model returned for them.
    #[must_use]
    pub fn stamped_from(mut self, place: &Place) -> Self {
        self.itinerary_image_url = place.image_url.clone();
        self.place_ref = place.reference.clone();
        self
    }
}
