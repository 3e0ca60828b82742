use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    upstream_calls_total: AtomicU64,
    upstream_failures_total: AtomicU64,
    unparsed_replies_total: AtomicU64,
    total_latency_millis: AtomicU64,
    latency_samples: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub upstream_calls_total: u64,
    pub upstream_failures_total: u64,
    pub unparsed_replies_total: u64,
    pub latency_samples: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("voyage_requests_total").increment(1);
    }

    pub fn inc_upstream_call(&self) {
        self.upstream_calls_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("voyage_upstream_calls_total").increment(1);
    }

    pub fn inc_upstream_failure(&self) {
        self.upstream_failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("voyage_upstream_failures_total").increment(1);
    }

    /// Model output that was expected to carry structured data but did not parse.
    pub fn inc_unparsed_reply(&self) {
        self.unparsed_replies_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("voyage_unparsed_replies_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        metrics::histogram!("voyage_request_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            upstream_calls_total: self.upstream_calls_total.load(Ordering::Relaxed),
            upstream_failures_total: self.upstream_failures_total.load(Ordering::Relaxed),
            unparsed_replies_total: self.unparsed_replies_total.load(Ordering::Relaxed),
            latency_samples: samples,
            avg_latency_millis: if samples == 0 {
                0.0
            } else {
                latency as f64 / samples as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,voyage_api=info,voyage_agents=info,voyage_providers=info,voyage_core=warn",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
