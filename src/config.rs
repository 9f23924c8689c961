//! Configuration management for the Compass service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::CompassError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the Compass service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompassConfig {
    /// Firebase web app settings identifying the cloud project
    #[serde(default)]
    pub firebase: FirebaseConfig,
    /// Vertex AI generation and embedding settings
    #[serde(default)]
    pub vertex: VertexConfig,
    /// Firestore content store settings
    #[serde(default)]
    pub firestore: FirestoreConfig,
    /// Itinerary flow settings
    #[serde(default)]
    pub flow: FlowConfig,
    /// Outbound HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// OpenTelemetry export settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Flow server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Firebase project settings. Only `project_id` is required by this crate,
/// the rest is carried for the hosting SDKs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub project_id: String,
    pub api_key: Option<String>,
    #[serde(default)]
    pub auth_domain: String,
    #[serde(default)]
    pub storage_bucket: String,
    #[serde(default)]
    pub messaging_sender_id: String,
    #[serde(default)]
    pub app_id: String,
}

/// Vertex AI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    /// Region hosting the generation backend
    #[serde(default = "default_vertex_location")]
    pub location: String,
    /// Gemini model used for itinerary and image prompts
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    /// Text embedding model used for place retrieval
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Sampling temperature for itinerary generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Override for the regional endpoint, mostly for tests
    pub base_url: Option<String>,
}

/// Firestore settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    #[serde(default = "default_firestore_database")]
    pub database: String,
    #[serde(default = "default_places_collection")]
    pub places_collection: String,
    #[serde(default = "default_vector_field")]
    pub vector_field: String,
    #[serde(default = "default_content_field")]
    pub content_field: String,
    #[serde(default = "default_activities_collection")]
    pub activities_collection: String,
    /// Field on activity documents holding the owning place ref
    #[serde(default = "default_activity_destination_field")]
    pub activity_destination_field: String,
    /// Maximum number of activities fetched per place
    #[serde(default = "default_activity_limit")]
    pub activity_limit: u32,
    pub base_url: Option<String>,
}

/// Itinerary flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Number of places requested from the retriever
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
    /// Describe uploaded images with the model instead of using the
    /// built-in placeholder description
    #[serde(default)]
    pub describe_images: bool,
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_http_max_retries")]
    pub max_retries: u32,
    /// Static access token; falls back to `GOOGLE_CLOUD_ACCESS_TOKEN` and gcloud
    pub access_token: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OTLP/HTTP collector base URL
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

/// Flow server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

// Default value functions
fn default_vertex_location() -> String {
    "us-central1".to_string()
}

fn default_generation_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_firestore_database() -> String {
    "(default)".to_string()
}

fn default_places_collection() -> String {
    "places".to_string()
}

fn default_vector_field() -> String {
    "embedding".to_string()
}

fn default_content_field() -> String {
    "knownFor".to_string()
}

fn default_activities_collection() -> String {
    "activities".to_string()
}

fn default_activity_destination_field() -> String {
    "destination".to_string()
}

fn default_activity_limit() -> u32 {
    10
}

fn default_retrieval_limit() -> usize {
    3
}

fn default_http_timeout() -> u32 {
    60
}

fn default_http_max_retries() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4318".to_string()
}

fn default_service_name() -> String {
    "compass".to_string()
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3400
}

fn default_request_timeout() -> u32 {
    120
}

fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            location: default_vertex_location(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            base_url: None,
        }
    }
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            database: default_firestore_database(),
            places_collection: default_places_collection(),
            vector_field: default_vector_field(),
            content_field: default_content_field(),
            activities_collection: default_activities_collection(),
            activity_destination_field: default_activity_destination_field(),
            activity_limit: default_activity_limit(),
            base_url: None,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            retrieval_limit: default_retrieval_limit(),
            describe_images: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            max_retries: default_http_max_retries(),
            access_token: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            request_timeout_seconds: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl CompassConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(std::env::var_os("COMPASS_CONFIG").map(PathBuf::from))
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // COMPASS_FIREBASE__PROJECT_ID -> firebase.project_id
        builder = builder.add_source(
            Environment::with_prefix("COMPASS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: CompassConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("compass").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.firebase.project_id.is_empty() {
            if let Ok(project) = std::env::var("GOOGLE_CLOUD_PROJECT") {
                self.firebase.project_id = project;
            }
        }
        if self.vertex.location.is_empty() {
            self.vertex.location = default_vertex_location();
        }
        if self.vertex.generation_model.is_empty() {
            self.vertex.generation_model = default_generation_model();
        }
        if self.vertex.embedding_model.is_empty() {
            self.vertex.embedding_model = default_embedding_model();
        }
        if self.firestore.activity_limit == 0 {
            self.firestore.activity_limit = default_activity_limit();
        }
        if self.flow.retrieval_limit == 0 {
            self.flow.retrieval_limit = default_retrieval_limit();
        }
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_http_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.telemetry.service_name.is_empty() {
            self.telemetry.service_name = default_service_name();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_project()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// The project id is the only setting every backend needs
    pub fn validate_project(&self) -> Result<()> {
        if self.firebase.project_id.trim().is_empty() {
            return Err(CompassError::config(
                "Firebase project id is missing. Set COMPASS_FIREBASE__PROJECT_ID or GOOGLE_CLOUD_PROJECT.",
            )
            .into());
        }

        if self.vertex.location.trim().is_empty() {
            return Err(CompassError::config("Vertex AI location cannot be empty").into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 300 {
            return Err(CompassError::config("HTTP timeout cannot exceed 300 seconds").into());
        }

        if self.http.max_retries > 10 {
            return Err(CompassError::config("HTTP max retries cannot exceed 10").into());
        }

        if self.flow.retrieval_limit > 20 {
            return Err(CompassError::config("Retrieval limit cannot exceed 20 places").into());
        }

        if self.firestore.activity_limit > 100 {
            return Err(CompassError::config("Activity limit cannot exceed 100").into());
        }

        if !(0.0..=2.0).contains(&self.vertex.temperature) {
            return Err(CompassError::config("Temperature must be between 0.0 and 2.0").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(CompassError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(CompassError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Vertex AI base URL", self.vertex.base_url.as_deref()),
            ("Firestore base URL", self.firestore.base_url.as_deref()),
            (
                "OTLP endpoint",
                self.telemetry
                    .enabled
                    .then_some(self.telemetry.otlp_endpoint.as_str()),
            ),
        ];
        for (name, url) in urls {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(CompassError::config(format!(
                        "{name} must be a valid HTTP or HTTPS URL"
                    ))
                    .into());
                }
            }
        }

        if self.server.tls_cert_path.is_some() != self.server.tls_key_path.is_some() {
            return Err(CompassError::config(
                "TLS needs both server.tls_cert_path and server.tls_key_path",
            )
            .into());
        }

        Ok(())
    }
}
