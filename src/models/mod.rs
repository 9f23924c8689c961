//! Data models for the Compass itinerary service
//!
//! This module contains the core domain models organized by concern:
//! - Place: candidate destinations surfaced by retrieval
//! - Activity: things to do at a place, fed into generation
//! - Destination: generated itineraries returned to callers
//! - Flow: the inbound and outbound shapes of the itinerary flow

pub mod activity;
pub mod destination;
pub mod flow;
pub mod place;

// Re-export all public types for convenient access
pub use activity::Activity;
pub use destination::{Destination, ItineraryActivity, ItineraryDay};
pub use flow::{ItineraryFlowInput, ItineraryFlowOutput};
pub use place::{DocumentPart, Place, RetrievedDocument};
