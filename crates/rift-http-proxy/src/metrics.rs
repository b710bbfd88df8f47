#![allow(dead_code)] // Functions used in binary, not in lib tests

//! Prometheus metrics for rift-http-proxy.
//!
//! Tracks fault injection activity, script execution, and proxy performance.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of requests processed
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "rift_requests_total",
        "Total number of requests processed by the proxy",
        &["method", "status"]
    )
    .unwrap();

    /// Total number of faults injected
    pub static ref FAULTS_INJECTED_TOTAL: CounterVec = register_counter_vec!(
        "rift_faults_injected_total",
        "Total number of faults injected",
        &["type", "rule_id", "source"]  // type: latency|error, source: v1|script
    )
    .unwrap();

    /// Latency fault duration in milliseconds
    pub static ref LATENCY_INJECTED_MS: HistogramVec = register_histogram_vec!(
        "rift_latency_injected_ms",
        "Histogram of injected latency in milliseconds",
        &["rule_id"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap();

    /// Error fault status codes
    pub static ref ERROR_STATUS_TOTAL: CounterVec = register_counter_vec!(
        "rift_error_status_total",
        "Count of error status codes injected",
        &["status", "rule_id"]
    )
    .unwrap();

    /// Script execution duration
    pub static ref SCRIPT_EXECUTION_DURATION_MS: HistogramVec = register_histogram_vec!(
        "rift_script_execution_duration_ms",
        "Histogram of script execution time in milliseconds",
        &["rule_id", "result"],  // result: inject|pass|error
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0]
    )
    .unwrap();

    /// Flow state operations
    pub static ref FLOW_STATE_OPS_TOTAL: CounterVec = register_counter_vec!(
        "rift_flow_state_ops_total",
        "Total number of flow state operations",
        &["operation", "result"]  // operation: get|set|increment|exists|delete, result: success|error
    )
    .unwrap();

    /// Active flows being tracked
    pub static ref ACTIVE_FLOWS: GaugeVec = register_gauge_vec!(
        "rift_active_flows",
        "Number of active flows being tracked in flow state",
        &["backend"]  // backend: inmemory|redis|valkey
    )
    .unwrap();

    /// Proxy request duration
    pub static ref PROXY_REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "rift_proxy_request_duration_ms",
        "Total request duration including faults and forwarding",
        &["method", "fault_applied"],  // fault_applied: none|latency|error|script
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();

    /// Upstream request duration (without faults)
    pub static ref UPSTREAM_REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "rift_upstream_request_duration_ms",
        "Duration of upstream requests (excluding fault injection)",
        &["method", "status"]
    )
    .unwrap();

    /// Script compilation errors
    pub static ref SCRIPT_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "rift_script_errors_total",
        "Total number of script execution errors",
        &["rule_id", "error_type"]  // error_type: syntax|runtime|flow_state
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Helper to record request processing
pub fn record_request(method: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

/// Helper to record fault injection
pub fn record_fault_injection(fault_type: &str, rule_id: &str, source: &str) {
    FAULTS_INJECTED_TOTAL
        .with_label_values(&[fault_type, rule_id, source])
        .inc();
}

/// Helper to record latency injection
pub fn record_latency_injection(rule_id: &str, duration_ms: u64) {
    LATENCY_INJECTED_MS
        .with_label_values(&[rule_id])
        .observe(duration_ms as f64);

    record_fault_injection("latency", rule_id, "v1");
}

/// Helper to record error injection
pub fn record_error_injection(rule_id: &str, status: u16) {
    ERROR_STATUS_TOTAL
        .with_label_values(&[&status.to_string(), rule_id])
        .inc();

    record_fault_injection("error", rule_id, "v1");
}

/// Helper to record script execution
pub fn record_script_execution(rule_id: &str, duration_ms: f64, result: &str) {
    SCRIPT_EXECUTION_DURATION_MS
        .with_label_values(&[rule_id, result])
        .observe(duration_ms);
}

/// Helper to record script fault injection
pub fn record_script_fault(fault_type: &str, rule_id: &str, duration_ms: Option<u64>) {
    record_fault_injection(fault_type, rule_id, "script");

    if fault_type == "latency" {
        if let Some(ms) = duration_ms {
            LATENCY_INJECTED_MS
                .with_label_values(&[rule_id])
                .observe(ms as f64);
        }
    }
}

/// Helper to record flow state operation
pub fn record_flow_state_op(operation: &str, success: bool) {
    let result = if success { "success" } else { "error" };
    FLOW_STATE_OPS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

/// Helper to set active flows gauge
pub fn set_active_flows(backend: &str, count: i64) {
    ACTIVE_FLOWS.with_label_values(&[backend]).set(count as f64);
}

/// Helper to record proxy request duration
pub fn record_proxy_duration(method: &str, duration_ms: f64, fault_applied: &str) {
    PROXY_REQUEST_DURATION_MS
        .with_label_values(&[method, fault_applied])
        .observe(duration_ms);
}

/// Helper to record upstream request duration
pub fn record_upstream_duration(method: &str, status: u16, duration_ms: f64) {
    UPSTREAM_REQUEST_DURATION_MS
        .with_label_values(&[method, &status.to_string()])
        .observe(duration_ms);
}

/// Helper to record script error
pub fn record_script_error(rule_id: &str, error_type: &str) {
    SCRIPT_ERRORS_TOTAL
        .with_label_values(&[rule_id, error_type])
        .inc();
}
