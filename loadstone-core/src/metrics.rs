use once_cell::sync::Lazy;
use prometheus::{
    IntCounterVec, IntGaugeVec, register_int_counter_vec, register_int_gauge_vec,
};

// Registration is process-wide: the collectors land in the default registry,
// which is the one pingora's prometheus service gathers on /metrics.

static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint"]
    )
    .expect("register http_requests_total")
});

static ALGORITHM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "balancer_algorithm_requests_total",
        "Total requests per balancing algorithm",
        &["algorithm"]
    )
    .expect("register balancer_algorithm_requests_total")
});

static ACTIVE_REQUESTS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "http_active_requests",
        "Number of active upstream requests",
        &["server"]
    )
    .expect("register http_active_requests")
});

/// Force registration of every collector. Called once at startup so the
/// metrics exist (at zero) before the first request arrives.
pub fn init() {
    Lazy::force(&REQUESTS_TOTAL);
    Lazy::force(&ALGORITHM_REQUESTS);
    Lazy::force(&ACTIVE_REQUESTS);
}

pub fn observe_request(method: &str, endpoint: &str, algorithm: &str) {
    REQUESTS_TOTAL.with_label_values(&[method, endpoint]).inc();
    ALGORITHM_REQUESTS.with_label_values(&[algorithm]).inc();
}

pub fn inc_active(server: &str) {
    ACTIVE_REQUESTS.with_label_values(&[server]).inc();
}

pub fn dec_active(server: &str) {
    ACTIVE_REQUESTS.with_label_values(&[server]).dec();
}
