//! Tracing setup with optional OpenTelemetry export.
//!
//! Diagnostics always go to stderr; stdout carries the change log only.

use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
};
use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Build an OTLP/gRPC tracer provider and install it globally.
///
/// Must be called from within a tokio runtime.
pub fn init_telemetry(
    service_name: &str,
    otlp_endpoint: &str,
) -> common::Result<(Tracer, TelemetryGuard)> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint)
        .build()
        .map_err(common::Error::telemetry)?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build();

    let tracer = provider.tracer(service_name.to_string());
    opentelemetry::global::set_tracer_provider(provider);

    Ok((tracer, TelemetryGuard))
}

/// Install the global tracing subscriber.
///
/// With `otel_enabled` unset this is plain stderr logging; otherwise spans
/// are also exported to `otlp_endpoint`. The returned guard must be kept
/// alive for the lifetime of the process.
pub fn setup_tracing_with_otel(
    service_name: &str,
    otlp_endpoint: &str,
    otel_enabled: bool,
    log_level: &str,
    json: bool,
) -> common::Result<Option<TelemetryGuard>> {
    if !otel_enabled {
        if json {
            common::logging::init_json(log_level);
        } else {
            common::logging::init(log_level);
        }
        return Ok(None);
    }

    let (tracer, guard) = init_telemetry(service_name, otlp_endpoint)?;
    tracing::subscriber::set_global_default(otel_subscriber(tracer, log_level, json))
        .map_err(common::Error::telemetry)?;

    tracing::info!(
        service_name,
        otlp_endpoint,
        "Tracing initialized with OpenTelemetry export"
    );
    Ok(Some(guard))
}

/// Subscriber exporting spans through `tracer` alongside stderr logging
fn otel_subscriber(
    tracer: Tracer,
    log_level: &str,
    json: bool,
) -> Box<dyn Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // OpenTelemetry layer goes under the fmt layer
    let base = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    if json {
        Box::new(base.with(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        Box::new(base.with(fmt::layer().with_writer(std::io::stderr)))
    }
}
