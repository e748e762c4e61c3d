use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for the laundry cart service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // Cart and session metrics
    pub cart_operations_total: CounterVec,
    pub sessions_active: Gauge,

    // Persistence metrics
    pub snapshot_operations_total: CounterVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("sessions_active", &self.sessions_active.get())
            .finish()
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        info!("Initializing Prometheus metrics");

        let http_requests_total = CounterVec::new(
            Opts::new(
                "http_requests_total",
                "Total number of HTTP requests processed",
            ),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "endpoint"],
        )?;

        let cart_operations_total = CounterVec::new(
            Opts::new("cart_operations_total", "Total number of cart operations"),
            &["operation"],
        )?;

        let sessions_active = Gauge::new("sessions_active", "Number of open cart sessions")?;

        let snapshot_operations_total = CounterVec::new(
            Opts::new(
                "snapshot_operations_total",
                "Total number of cart snapshot reads and writes",
            ),
            &["operation", "status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(cart_operations_total.clone()))?;
        registry.register(Box::new(sessions_active.clone()))?;
        registry.register(Box::new(snapshot_operations_total.clone()))?;

        Ok(Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            cart_operations_total,
            sessions_active,
            snapshot_operations_total,
        })
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Record HTTP request metrics
    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();

        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    /// Record a dispatched cart operation
    pub fn record_cart_operation(&self, operation: &str) {
        self.cart_operations_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Record a snapshot read or write
    pub fn record_snapshot_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };

        self.snapshot_operations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    pub fn session_started(&self) {
        self.sessions_active.inc();
    }

    pub fn session_ended(&self) {
        self.sessions_active.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_http_request_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_http_request("GET", "/api/cart", 200, 0.012);
        metrics.record_http_request("POST", "/api/cart/items", 400, 0.003);

        let metrics_text = metrics.encode().unwrap();
        assert!(metrics_text.contains("http_requests_total"));
        assert!(metrics_text.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_cart_and_snapshot_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_cart_operation("add_item");
        metrics.record_snapshot_operation("write", true);
        metrics.record_snapshot_operation("read", false);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("cart_operations_total"));
        assert!(encoded.contains(r#"snapshot_operations_total{operation="read",status="error"} 1"#));
    }

    #[test]
    fn test_session_gauge() {
        let metrics = Metrics::new().unwrap();

        metrics.session_started();
        metrics.session_started();
        metrics.session_ended();

        assert_eq!(metrics.sessions_active.get(), 1.0);
    }
}
