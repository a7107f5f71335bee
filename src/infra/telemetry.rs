use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED_KEYS, METRIC_CACHE_MISS,
    METRIC_CACHE_POPULATE_FAILED,
};
use crate::config::{LogFormat, LoggingSettings};
use crate::events::{METRIC_EVENTS_FAILED, METRIC_EVENTS_PUBLISHED};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of reads served from the cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of reads that fell through to the record store."
        );
        describe_counter!(
            METRIC_CACHE_ERROR,
            Unit::Count,
            "Total number of cache backend or decode failures."
        );
        describe_counter!(
            METRIC_CACHE_POPULATE_FAILED,
            Unit::Count,
            "Total number of background cache writes that failed."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATED_KEYS,
            Unit::Count,
            "Total number of cache keys removed after writes."
        );
        describe_counter!(
            METRIC_EVENTS_PUBLISHED,
            Unit::Count,
            "Total number of book events delivered to the sink."
        );
        describe_counter!(
            METRIC_EVENTS_FAILED,
            Unit::Count,
            "Total number of book events the sink failed to accept."
        );
    });
}
