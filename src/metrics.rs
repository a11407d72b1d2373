use lazy_static::lazy_static;
use prometheus::{
    Encoder, Gauge, Histogram, IntCounterVec, TextEncoder, register_gauge, register_histogram,
    register_int_counter_vec,
};

lazy_static! {
    // labelled by outcome: ok, unauthorized, unavailable, invalid, rate_limited, backend_error
    pub static ref CHAT_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "gateway_chat_requests_total",
        "Chat requests by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref CHAT_LATENCY: Histogram = register_histogram!(
        "gateway_chat_latency_seconds",
        "Latency of admitted chat requests in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_TRACKED_KEYS: Gauge = register_gauge!(
        "gateway_rate_limit_tracked_keys",
        "Identity keys holding a rate limit bucket"
    )
    .unwrap();
}

// Render the default registry in the text exposition format
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
