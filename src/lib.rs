//! Compass - travel itinerary planning on Vertex AI and Firestore
//!
//! A trip request is turned into a handful of candidate places by vector
//! search, and each place gets a generated day-by-day itinerary. Places the
//! model could not plan are dropped from the result.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod firestore;
pub mod flow;
pub mod generation;
pub mod models;
pub mod prompt;
pub mod retriever;
pub mod telemetry;
pub mod vertex;
pub mod web;

// Re-export core types for public API
pub use client::{CompassClient, Plugin};
pub use config::CompassConfig;
pub use error::CompassError;
pub use flow::ItineraryFlow;
pub use generation::{ImageDescriber, ItineraryGenerator};
pub use models::{Activity, Destination, ItineraryFlowInput, ItineraryFlowOutput, Place};
pub use prompt::ItineraryPromptInput;
pub use retriever::{ActivityCatalog, PlacesRetriever};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
