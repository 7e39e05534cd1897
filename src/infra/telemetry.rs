use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and describe the cache metrics.
///
/// Fails if a subscriber is already installed.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "feelslap_query_cache_hit_total",
            Unit::Count,
            "Cached query reads answered from a fresh entry."
        );
        describe_counter!(
            "feelslap_query_cache_miss_total",
            Unit::Count,
            "Cached query reads that went to the boundary (absent or stale)."
        );
        describe_counter!(
            "feelslap_query_cache_evict_total",
            Unit::Count,
            "Query cache entries evicted due to capacity."
        );
        describe_counter!(
            "feelslap_query_cache_coalesced_total",
            Unit::Count,
            "Reads that joined an identical in-flight boundary call."
        );
        describe_counter!(
            "feelslap_query_cache_invalidated_total",
            Unit::Count,
            "Query cache entries marked stale by mutations or reconnects."
        );
    });
}
