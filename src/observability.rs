//! Observability utilities.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::types::{ObservabilityConfig, ENV_LOG_FORMAT};

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Metric tag carrying the type of the first logical message of an envelope.
pub const MESSAGE_TYPE_TAG: &str = "nservicebus.message_type";

/// Type-erased subscriber, text or JSON.
pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Initialize tracing subscriber once for the process.
///
/// Log format defaults to plain text and can be switched to JSON via
/// `INGRESS_LOG_FORMAT=json`. Filter defaults to `info` if `RUST_LOG` is unset.
pub fn init_tracing() {
    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing_with(&ObservabilityConfig {
        json_logs: json,
        ..Default::default()
    });
}

/// Initialize tracing from configuration. `RUST_LOG` still takes precedence
/// over the configured level.
pub fn init_tracing_with(config: &ObservabilityConfig) {
    TRACING_INIT.get_or_init(|| {
        if let Err(err) = subscriber(config).try_init() {
            eprintln!("tracing init skipped: {err}");
        }
    });
}

/// Build the subscriber described by `config` without installing it.
pub fn subscriber(config: &ObservabilityConfig) -> BoxedSubscriber {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        Box::new(
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json()),
        )
    } else {
        Box::new(
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact()),
        )
    }
}

/// Metric tags collected while one envelope moves through the incoming
/// pipeline. Clones share the same tag set.
#[derive(Debug, Clone, Default)]
pub struct IncomingPipelineMetricTags(Arc<Mutex<BTreeMap<String, String>>>);

impl IncomingPipelineMetricTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag, replacing any previous value.
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>) {
        self.0.lock().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.lock().get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.0.lock().clone()
    }
}
