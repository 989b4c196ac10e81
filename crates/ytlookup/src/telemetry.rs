use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry_prometheus::PrometheusExporter;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::{EnvFilter, fmt};

static LOGGING: OnceLock<()> = OnceLock::new();
static TELEMETRY: OnceCell<TelemetryState> = OnceCell::new();
static METRICS: OnceCell<MetricsHandles> = OnceCell::new();

struct TelemetryState {
    _provider: SdkMeterProvider,
    registry: Registry,
}

struct MetricsHandles {
    invocations: Counter<u64>,
    failures: Counter<u64>,
    search_results: Counter<u64>,
    latency_histogram: Histogram<f64>,
}

/// Install the JSON log subscriber on stderr. `default_level` applies when `RUST_LOG` is unset.
/// Safe to call multiple times; only the first call takes effect.
pub fn init_logging(default_level: &str) {
    LOGGING.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Initialize logging and the Prometheus metrics exporter. Safe to call multiple times.
pub fn init() -> Result<()> {
    init_logging("info");
    configure_metrics()?;
    Ok(())
}

fn configure_metrics() -> Result<&'static TelemetryState> {
    TELEMETRY.get_or_try_init(|| {
        let registry = Registry::new();
        let exporter = build_exporter(&registry)?;

        let provider = SdkMeterProvider::builder()
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                "ytlookup",
            )]))
            .with_reader(exporter)
            .build();

        global::set_meter_provider(provider.clone());

        let meter = global::meter("ytlookup");
        let invocations = meter
            .u64_counter("ytlookup_extractor_invocations_total")
            .with_description("Number of yt-dlp invocations, by operation")
            .init();
        let failures = meter
            .u64_counter("ytlookup_extractor_failures_total")
            .with_description("Number of yt-dlp invocations that failed, by operation")
            .init();
        let search_results = meter
            .u64_counter("ytlookup_search_results_total")
            .with_description("Number of search results returned to callers")
            .init();
        let latency_histogram = meter
            .f64_histogram("ytlookup_extractor_latency_ms")
            .with_description("Latency of yt-dlp invocations in milliseconds")
            .init();

        METRICS
            .set(MetricsHandles {
                invocations,
                failures,
                search_results,
                latency_histogram,
            })
            .map_err(|_| anyhow!("metrics handles already initialized"))?;

        Ok(TelemetryState {
            _provider: provider,
            registry,
        })
    })
}

fn build_exporter(registry: &Registry) -> Result<PrometheusExporter> {
    opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .context("failed to build Prometheus exporter")
}

fn metrics() -> Option<&'static MetricsHandles> {
    METRICS.get()
}

/// Record an extractor invocation for `operation` (`search` or `resolve`).
pub fn record_invocation(operation: &'static str) {
    if let Some(metrics) = metrics() {
        metrics
            .invocations
            .add(1, &[KeyValue::new("operation", operation)]);
    }
}

pub fn record_failure(operation: &'static str) {
    if let Some(metrics) = metrics() {
        metrics
            .failures
            .add(1, &[KeyValue::new("operation", operation)]);
    }
}

pub fn record_results(count: usize) {
    if count == 0 {
        return;
    }
    if let Some(metrics) = metrics() {
        metrics.search_results.add(count as u64, &[]);
    }
}

pub fn record_latency(operation: &'static str, elapsed: Duration) {
    if let Some(metrics) = metrics() {
        metrics.latency_histogram.record(
            elapsed.as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", operation)],
        );
    }
}

/// Render all currently collected metrics in Prometheus text format.
pub fn export_prometheus() -> Result<String> {
    let state = TELEMETRY
        .get()
        .ok_or_else(|| anyhow!("telemetry not initialized"))?;
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("failed to encode metrics")?;
    String::from_utf8(buffer).context("metrics buffer is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_metrics_include_recorded_operations() {
        init().unwrap();
        record_invocation("search");
        record_latency("search", Duration::from_millis(12));
        record_results(3);

        let text = export_prometheus().unwrap();
        assert!(text.contains("ytlookup_extractor_invocations_total"));
        assert!(text.contains("operation=\"search\""));
    }
}
