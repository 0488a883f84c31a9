use opentelemetry::trace::TraceError;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace as sdktrace, Resource};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Quiet database internals unless `RUST_LOG` says otherwise.
const DEFAULT_FILTER: &str = "info,smarttrip_api=info,sqlx=warn,sea_orm=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Anything but `json` (case-insensitive) falls back to text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Installs the global subscriber: env filter, text or JSON output and,
/// when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OTLP span exporter.
pub fn init_telemetry(service_name: &str) -> Result<(), TraceError> {
    let log_format = LogFormat::parse(&std::env::var("RUST_LOG_FORMAT").unwrap_or_default());
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into()),
    );
    let registry = tracing_subscriber::registry().with(env_filter);

    let otel_layer = match otlp_endpoint {
        Some(endpoint) => {
            let resource = Resource::new(vec![
                KeyValue::new(resource::SERVICE_NAME, service_name.to_string()),
                KeyValue::new(resource::SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
            ]);

            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint),
                )
                .with_trace_config(
                    sdktrace::config()
                        .with_resource(resource)
                        .with_sampler(sdktrace::Sampler::AlwaysOn),
                )
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    match log_format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true);
            registry.with(otel_layer).with(fmt_layer).init();
        }
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
            registry.with(otel_layer).with(fmt_layer).init();
        }
    }
    Ok(())
}

/// Flushes pending spans before exit.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
