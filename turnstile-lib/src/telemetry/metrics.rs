use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::security::rate_limit::Category;
use crate::security::SuspicionReason;

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const CATEGORY: &str = "category";
    pub const REASON: &str = "reason";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const STORE: &str = "store";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const ERROR_RATE_LIMITED: &str = "rate_limited";
    pub const ERROR_SUSPICIOUS: &str = "suspicious";
    pub const ERROR_UPSTREAM: &str = "upstream";
    pub const ERROR_UPSTREAM_TIMEOUT: &str = "upstream_timeout";
    pub const STORE_WINDOWS: &str = "windows";
    pub const STORE_BURSTS: &str = "bursts";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,

    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    pub upstream_requests_total: Counter<u64>,
    pub upstream_duration_seconds: Histogram<f64>,
    pub errors_total: Counter<u64>,

    // Rate limiting metrics
    pub rate_limit_requests_total: Counter<u64>,
    pub rate_limit_allowed_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,

    // Suspicion metrics
    pub suspicious_requests_total: Counter<u64>,
    pub suspicious_denied_total: Counter<u64>,

    // Window store housekeeping
    pub sweep_runs_total: Counter<u64>,
    pub sweep_removed_total: Counter<u64>,
    pub tracked_keys: Gauge<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("turnstile_connections_total")
                .with_description("Total number of connections accepted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("turnstile_connections_active")
                .with_description("Number of active connections")
                .build(),

            requests_total: meter
                .u64_counter("turnstile_requests_total")
                .with_description("Total number of requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("turnstile_requests_duration_seconds")
                .with_description("Request duration in seconds, guard and upstream included")
                .build(),

            upstream_requests_total: meter
                .u64_counter("turnstile_upstream_requests_total")
                .with_description("Total number of requests forwarded upstream")
                .build(),
            upstream_duration_seconds: meter
                .f64_histogram("turnstile_upstream_duration_seconds")
                .with_description("Upstream response time in seconds")
                .build(),
            errors_total: meter
                .u64_counter("turnstile_errors_total")
                .with_description("Total number of denied or failed requests by error type")
                .build(),

            rate_limit_requests_total: meter
                .u64_counter("turnstile_rate_limit_requests_total")
                .with_description("Total number of rate limit evaluations")
                .build(),
            rate_limit_allowed_total: meter
                .u64_counter("turnstile_rate_limit_allowed_total")
                .with_description("Total number of requests within quota")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("turnstile_rate_limit_rejected_total")
                .with_description("Total number of requests over quota")
                .build(),

            suspicious_requests_total: meter
                .u64_counter("turnstile_suspicious_requests_total")
                .with_description("Total number of requests flagged as suspicious")
                .build(),
            suspicious_denied_total: meter
                .u64_counter("turnstile_suspicious_denied_total")
                .with_description("Total number of requests denied as suspicious")
                .build(),

            sweep_runs_total: meter
                .u64_counter("turnstile_sweep_runs_total")
                .with_description("Total number of background expiry sweeps")
                .build(),
            sweep_removed_total: meter
                .u64_counter("turnstile_sweep_removed_total")
                .with_description("Total number of expired records removed by sweeps")
                .build(),
            tracked_keys: meter
                .u64_gauge("turnstile_tracked_keys")
                .with_description("Live window records after the last sweep")
                .build(),

            build_info: meter
                .u64_gauge("turnstile_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_rate_limit_request(&self, category: Category) {
        self.rate_limit_requests_total
            .add(1, &[KeyValue::new(labels::CATEGORY, category.as_str())]);
    }

    pub fn record_rate_limit_allowed(&self, category: Category) {
        self.rate_limit_allowed_total
            .add(1, &[KeyValue::new(labels::CATEGORY, category.as_str())]);
    }

    pub fn record_rate_limit_rejection(&self, category: Category) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, values::ERROR_RATE_LIMITED)]);
        self.rate_limit_rejected_total
            .add(1, &[KeyValue::new(labels::CATEGORY, category.as_str())]);
    }

    /// A suspicious verdict; `denied` is false when the action is `log`
    pub fn record_suspicious(&self, reason: SuspicionReason, denied: bool) {
        let attrs = &[KeyValue::new(labels::REASON, reason.label())];
        self.suspicious_requests_total.add(1, attrs);
        if denied {
            self.errors_total
                .add(1, &[KeyValue::new(labels::ERROR_TYPE, values::ERROR_SUSPICIOUS)]);
            self.suspicious_denied_total.add(1, attrs);
        }
    }

    pub fn record_request(&self, method: &str, status_code: u16, category: Category) {
        self.requests_total.add(
            1,
            &[
                KeyValue::new(labels::METHOD, method.to_string()),
                KeyValue::new(labels::STATUS_CODE, i64::from(status_code)),
                KeyValue::new(labels::CATEGORY, category.as_str()),
            ],
        );
    }

    pub fn record_request_duration(&self, duration: f64, category: Category) {
        self.requests_duration_seconds
            .record(duration, &[KeyValue::new(labels::CATEGORY, category.as_str())]);
    }

    pub fn record_upstream_request(&self, status_code: u16, duration: f64) {
        self.upstream_requests_total
            .add(1, &[KeyValue::new(labels::STATUS_CODE, i64::from(status_code))]);
        self.upstream_duration_seconds.record(duration, &[]);
    }

    pub fn record_error(&self, error_type: &'static str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type)]);
    }

    pub fn record_sweep(&self, windows: usize, bursts: usize, tracked: usize) {
        self.sweep_runs_total.add(1, &[]);
        self.sweep_removed_total.add(
            u64::try_from(windows).unwrap_or(u64::MAX),
            &[KeyValue::new(labels::STORE, values::STORE_WINDOWS)],
        );
        self.sweep_removed_total.add(
            u64::try_from(bursts).unwrap_or(u64::MAX),
            &[KeyValue::new(labels::STORE, values::STORE_BURSTS)],
        );
        self.tracked_keys
            .record(u64::try_from(tracked).unwrap_or(u64::MAX), &[]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("turnstile");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
