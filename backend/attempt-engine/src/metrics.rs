use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Attempt lifecycle
    pub static ref ATTEMPTS_RESOLVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "attempts_resolved_total",
        "Screen entries by resolution path",
        &["path"]
    )
    .unwrap();

    pub static ref ATTEMPTS_STARTED_TOTAL: IntCounter = register_int_counter!(
        "attempts_started_total",
        "Total number of attempts started"
    )
    .unwrap();

    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_total",
        "Submissions that reached a result",
        &["trigger", "outcome"]
    )
    .unwrap();

    pub static ref SUBMISSIONS_IGNORED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_ignored_total",
        "Submission triggers dropped by the latch",
        &["trigger"]
    )
    .unwrap();

    pub static ref TIMER_EXPIRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "timer_expiries_total",
        "Expiry events by where they were observed",
        &["source"]
    )
    .unwrap();

    pub static ref SCREENS_ACTIVE: IntGauge = register_int_gauge!(
        "screens_active",
        "Number of currently mounted quiz screens"
    )
    .unwrap();

    pub static ref SCREENS_EVICTED_TOTAL: IntCounter = register_int_counter!(
        "screens_evicted_total",
        "Screens unmounted by the idle sweeper"
    )
    .unwrap();

    pub static ref SCREEN_SWEEPS_TOTAL: IntCounter = register_int_counter!(
        "screen_sweeps_total",
        "Idle screen sweeps performed"
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}
