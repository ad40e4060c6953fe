//! Adapter metrics

use adapter_core::AdapterKind;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge_vec, CounterVec,
    HistogramVec, IntGaugeVec,
};

lazy_static::lazy_static! {
    pub static ref ADAPTER_OPERATIONS_TOTAL: CounterVec = register_counter_vec!(
        "adapter_operations_total",
        "Total adapter operations",
        &["adapter", "operation", "status"]
    )
    .unwrap();

    pub static ref ADAPTER_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "adapter_operation_duration_seconds",
        "Adapter operation duration",
        &["adapter", "operation"]
    )
    .unwrap();

    pub static ref ADAPTER_CONNECTED: IntGaugeVec = register_int_gauge_vec!(
        "adapter_connected",
        "Whether the adapter holds an established session (0/1)",
        &["adapter", "kind"]
    )
    .unwrap();
}

/// Record one `execute` outcome.
pub(crate) fn record_operation(
    adapter: &str,
    operation: &str,
    success: bool,
    elapsed: std::time::Duration,
) {
    let status = if success { "success" } else { "failure" };
    ADAPTER_OPERATIONS_TOTAL
        .with_label_values(&[adapter, operation, status])
        .inc();
    ADAPTER_OPERATION_DURATION
        .with_label_values(&[adapter, operation])
        .observe(elapsed.as_secs_f64());
}

/// Flip the connected gauge for an adapter instance.
pub(crate) fn set_connected(adapter: &str, kind: AdapterKind, connected: bool) {
    ADAPTER_CONNECTED
        .with_label_values(&[adapter, &kind.to_string()])
        .set(if connected { 1 } else { 0 });
}
