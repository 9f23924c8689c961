//! Logging and OpenTelemetry export setup

use anyhow::{Context, Result};
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, logs::SdkLoggerProvider, trace::SdkTracerProvider};
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Directive, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{VERSION, config::CompassConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Crates whose own logs must not be exported, or exporting them would
/// generate more logs.
const EXPORT_SILENCED: [&str; 4] = ["hyper", "opentelemetry", "reqwest", "h2"];

/// Flushes and shuts down the exporters when dropped
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down tracer provider: {e}");
            }
        }
        if let Some(provider) = self.logger_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down logger provider: {e}");
            }
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level`. Spans and log records are exported
/// over OTLP/HTTP only when telemetry is enabled.
pub fn init(config: &CompassConfig) -> Result<TelemetryGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = TelemetryGuard::default();

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    layers.push(match config.logging.format.as_str() {
        "json" => fmt_layer.json().boxed(),
        _ => fmt_layer.pretty().boxed(),
    });

    if config.telemetry.enabled {
        let resource = resource(config);

        let span_exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(signal_endpoint(&config.telemetry.otlp_endpoint, "traces"))
            .build()
            .context("Failed to build OTLP span exporter")?;
        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_resource(resource.clone())
            .build();
        let tracer = tracer_provider.tracer(config.telemetry.service_name.clone());
        global::set_tracer_provider(tracer_provider.clone());
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());

        let log_exporter = LogExporter::builder()
            .with_http()
            .with_endpoint(signal_endpoint(&config.telemetry.otlp_endpoint, "logs"))
            .build()
            .context("Failed to build OTLP log exporter")?;
        let logger_provider = SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build();
        layers.push(
            OpenTelemetryTracingBridge::new(&logger_provider)
                .with_filter(export_filter()?)
                .boxed(),
        );

        guard.tracer_provider = Some(tracer_provider);
        guard.logger_provider = Some(logger_provider);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(&config.logging.level)?)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {level}"))
}

fn export_filter() -> Result<EnvFilter> {
    EXPORT_SILENCED
        .iter()
        .try_fold(EnvFilter::new("info"), |filter, target| {
            let directive = format!("{target}=off").parse::<Directive>()?;
            Ok::<_, anyhow::Error>(filter.add_directive(directive))
        })
}

fn resource(config: &CompassConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.telemetry.service_name.clone())
        .with_attribute(KeyValue::new(SERVICE_VERSION, VERSION))
        .with_attribute(KeyValue::new(
            "gcp.project_id",
            config.firebase.project_id.clone(),
        ))
        .build()
}

/// OTLP/HTTP path for one signal under the collector base URL
fn signal_endpoint(base: &str, signal: &str) -> String {
    format!("{}/v1/{signal}", base.trim_end_matches('/'))
}
