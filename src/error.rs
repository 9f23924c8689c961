//! Error types and handling for the Compass itinerary service

use thiserror::Error;

/// Main error type for the Compass service
#[derive(Error, Debug)]
pub enum CompassError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Errors returned by Vertex AI or Firestore
    #[error("API error: {message}")]
    Api { message: String },

    /// Access token could not be obtained or was rejected
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Upstream quota exhausted
    #[error("Rate limit error: {message}")]
    RateLimit { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },
}

impl CompassError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn rate_limit<S: Into<String>>(message: S) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CompassError::Config { .. } => {
                "Configuration error. Please check your config file and project settings.".to_string()
            }
            CompassError::Api { .. } => {
                "Unable to reach the itinerary backends. Please try again later.".to_string()
            }
            CompassError::Auth { .. } => {
                "Not authorized against Google Cloud. Check your credentials.".to_string()
            }
            CompassError::RateLimit { .. } => {
                "Too many requests to the model backend. Please slow down.".to_string()
            }
            CompassError::Validation { message } => {
                format!("Invalid input: {message}")
            }
        }
    }

    /// Map an upstream HTTP status to the matching error variant.
    #[must_use]
    pub fn from_status(service: &str, status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::auth(format!("{service} rejected credentials ({status}): {body}")),
            429 => Self::rate_limit(format!("{service} rate limit exceeded: {body}")),
            _ => Self::api(format!("{service} error {status}: {body}")),
        }
    }
}
