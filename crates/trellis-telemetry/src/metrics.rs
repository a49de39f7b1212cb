//! Request metrics through the `metrics` facade.
//!
//! Nothing is exported from here; the host application installs whichever
//! recorder it wants. Without one, recording is a no-op.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `trellis_requests_total` | Counter | `action`, `status` |
//! | `trellis_request_duration_seconds` | Histogram | `action` |
//! | `trellis_in_flight_requests` | Gauge | - |

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Counter of handled requests.
pub const REQUESTS_TOTAL: &str = "trellis_requests_total";

/// Histogram of request latency.
pub const REQUEST_DURATION_SECONDS: &str = "trellis_request_duration_seconds";

/// Gauge of requests being handled.
pub const IN_FLIGHT_REQUESTS: &str = "trellis_in_flight_requests";

/// Registers descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests handled");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Request handling duration in seconds"
    );
    describe_gauge!(IN_FLIGHT_REQUESTS, "Requests currently being handled");
}

/// Records a completed request.
///
/// `action` is the dispatched action name, or `"unmatched"` when no route
/// matched.
pub fn record_request(action: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "action" => action.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "action" => action.to_string())
        .record(duration.as_secs_f64());
}

/// Increments the in-flight gauge.
pub fn increment_in_flight() {
    gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
}

/// Decrements the in-flight gauge.
pub fn decrement_in_flight() {
    gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
}

/// Keeps the in-flight gauge raised while alive.
#[derive(Debug)]
pub struct InFlightGuard(());

impl InFlightGuard {
    /// Increments the gauge; dropping the guard decrements it.
    #[must_use]
    pub fn enter() -> Self {
        increment_in_flight();
        Self(())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        decrement_in_flight();
    }
}
