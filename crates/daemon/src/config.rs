//! Worker configuration, resolved from the process environment once at boot.
//!
//! Boolean flags use the literal string `"true"`. A numeric parameter that
//! is present but non-numeric or non-positive aborts startup; absent
//! parameters fall back to the defaults below. The resolved snapshot is
//! immutable for the process lifetime.

use anyhow::{anyhow, bail, Result};
use conductor_core::domain::{ConsumerConfig, QueueName, RateLimit};
use std::time::Duration;

const DEFAULT_INGESTION_CONCURRENCY: usize = 4;
const DEFAULT_EVAL_CREATOR_CONCURRENCY: usize = 2;
const DEFAULT_EVAL_EXECUTION_CONCURRENCY: usize = 4;
const DEFAULT_LEGACY_INGESTION_CONCURRENCY: usize = 2;
// One export at a time, one per window: exports hammer the shared database
const DEFAULT_BATCH_EXPORT_MAX_PER_WINDOW: u32 = 1;
const DEFAULT_BATCH_EXPORT_WINDOW_MS: u64 = 5_000;
const DEFAULT_HTTP_PORT: u16 = 3030;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 30_000;

/// One queue's registration decision, precomputed from the environment
pub struct QueuePlan {
    pub queue: QueueName,
    pub enabled: bool,
    pub config: ConsumerConfig,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub ingestion_enabled: bool,
    pub ingestion_concurrency: usize,
    pub trace_upsert_enabled: bool,
    pub eval_creator_concurrency: usize,
    pub eval_execution_enabled: bool,
    pub eval_execution_concurrency: usize,
    pub batch_export_enabled: bool,
    pub batch_export_max_per_window: u32,
    pub batch_export_window_ms: u64,
    pub legacy_ingestion_enabled: bool,
    pub legacy_ingestion_concurrency: usize,
    pub usage_metering_enabled: bool,
    pub billing_api_key: Option<String>,
    pub background_migrations_enabled: bool,
    pub http_port: u16,
    pub shutdown_grace_ms: u64,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    /// Injectable variant of `from_env` for tests
    pub fn resolve_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            ingestion_enabled: flag(&lookup, "CONDUCTOR_QUEUE_INGESTION_ENABLED"),
            ingestion_concurrency: positive(
                &lookup,
                "CONDUCTOR_INGESTION_CONCURRENCY",
                DEFAULT_INGESTION_CONCURRENCY,
            )?,
            trace_upsert_enabled: flag(&lookup, "CONDUCTOR_QUEUE_TRACE_UPSERT_ENABLED"),
            eval_creator_concurrency: positive(
                &lookup,
                "CONDUCTOR_EVAL_CREATOR_CONCURRENCY",
                DEFAULT_EVAL_CREATOR_CONCURRENCY,
            )?,
            eval_execution_enabled: flag(&lookup, "CONDUCTOR_QUEUE_EVAL_EXECUTION_ENABLED"),
            eval_execution_concurrency: positive(
                &lookup,
                "CONDUCTOR_EVAL_EXECUTION_CONCURRENCY",
                DEFAULT_EVAL_EXECUTION_CONCURRENCY,
            )?,
            batch_export_enabled: flag(&lookup, "CONDUCTOR_QUEUE_BATCH_EXPORT_ENABLED"),
            batch_export_max_per_window: positive(
                &lookup,
                "CONDUCTOR_BATCH_EXPORT_MAX_PER_WINDOW",
                DEFAULT_BATCH_EXPORT_MAX_PER_WINDOW,
            )?,
            batch_export_window_ms: positive(
                &lookup,
                "CONDUCTOR_BATCH_EXPORT_WINDOW_MS",
                DEFAULT_BATCH_EXPORT_WINDOW_MS,
            )?,
            legacy_ingestion_enabled: flag(&lookup, "CONDUCTOR_QUEUE_LEGACY_INGESTION_ENABLED"),
            legacy_ingestion_concurrency: positive(
                &lookup,
                "CONDUCTOR_LEGACY_INGESTION_CONCURRENCY",
                DEFAULT_LEGACY_INGESTION_CONCURRENCY,
            )?,
            usage_metering_enabled: flag(&lookup, "CONDUCTOR_QUEUE_USAGE_METERING_ENABLED"),
            billing_api_key: lookup("BILLING_API_KEY").filter(|key| !key.trim().is_empty()),
            background_migrations_enabled: flag(&lookup, "CONDUCTOR_ENABLE_BACKGROUND_MIGRATIONS"),
            http_port: positive(&lookup, "CONDUCTOR_HTTP_PORT", DEFAULT_HTTP_PORT)?,
            shutdown_grace_ms: positive(
                &lookup,
                "CONDUCTOR_SHUTDOWN_GRACE_MS",
                DEFAULT_SHUTDOWN_GRACE_MS,
            )?,
        })
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Metering was asked for but cannot activate without a credential
    pub fn metering_blocked_on_credential(&self) -> bool {
        self.usage_metering_enabled && self.billing_api_key.is_none()
    }

    /// Declarative registration plan: one loop in main registers every
    /// enabled entry, so adding a queue is a data change here, not new
    /// registration code.
    pub fn queue_plan(&self) -> Result<Vec<QueuePlan>> {
        let export_limit = RateLimit::new(
            self.batch_export_max_per_window,
            self.batch_export_window_ms,
        )?;

        Ok(vec![
            QueuePlan {
                queue: QueueName::Ingestion,
                enabled: self.ingestion_enabled,
                config: ConsumerConfig::new(self.ingestion_concurrency)?,
            },
            QueuePlan {
                queue: QueueName::TraceUpsert,
                enabled: self.trace_upsert_enabled,
                config: ConsumerConfig::new(self.eval_creator_concurrency)?,
            },
            QueuePlan {
                queue: QueueName::EvalExecution,
                enabled: self.eval_execution_enabled,
                config: ConsumerConfig::new(self.eval_execution_concurrency)?,
            },
            QueuePlan {
                queue: QueueName::BatchExport,
                enabled: self.batch_export_enabled,
                config: ConsumerConfig::new(1)?.with_rate_limit(export_limit),
            },
            QueuePlan {
                queue: QueueName::LegacyIngestion,
                enabled: self.legacy_ingestion_enabled,
                config: ConsumerConfig::new(self.legacy_ingestion_concurrency)?,
            },
            QueuePlan {
                queue: QueueName::CloudUsageMetering,
                enabled: self.usage_metering_enabled && self.billing_api_key.is_some(),
                config: ConsumerConfig::new(1)?,
            },
        ])
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> bool {
    lookup(name).map(|v| v == "true").unwrap_or(false)
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + From<u8> + std::fmt::Display,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let value: T = raw
        .trim()
        .parse()
        .map_err(|e| anyhow!("{name} must be a positive integer, got {raw:?}: {e}"))?;
    if value < T::from(1u8) {
        bail!("{name} must be >= 1, got {value}");
    }
    Ok(value)
}
