//! Structured request logging with correlation tracking
//!
//! Every call through the pipeline gets a correlation id that shows up in its
//! log lines and in the `X-Correlation-Id` request header. Credentials never
//! reach the log: authorization headers are replaced and tokens shortened.

use log::{debug, warn};
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Context for a single request attempt
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub method: String,
    pub path: String,
    pub attempt: u32,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn new(method: &str, path: &str, attempt: u32) -> Self {
        Self {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            method: method.to_string(),
            path: path.to_string(),
            attempt,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

pub fn log_request(context: &RequestContext, url: &str, headers: &[(String, String)]) {
    let log_data = json!({
        "event": "http_request",
        "correlation_id": context.correlation_id,
        "method": context.method,
        "url": url,
        "attempt": context.attempt,
        "headers": sanitize_headers(headers),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    debug!("HTTP Request: {}", log_data);
}

pub fn log_response(context: &RequestContext, status_code: u16) {
    let log_data = json!({
        "event": "http_response",
        "correlation_id": context.correlation_id,
        "method": context.method,
        "path": context.path,
        "status_code": status_code,
        "duration_ms": context.elapsed().as_millis(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    if status_code >= 400 {
        warn!("HTTP Response (Error): {}", log_data);
    } else {
        debug!("HTTP Response: {}", log_data);
    }
}

/// First four characters of a credential followed by an ellipsis
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…", prefix)
}

fn sanitize_headers(headers: &[(String, String)]) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(key, value)| {
            let key_lower = key.to_lowercase();
            if key_lower.contains("authorization") || key_lower.contains("token") {
                (key.clone(), "[REDACTED]".to_string())
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}
