// Queue Domain Model

use serde::{Deserialize, Serialize};

/// Logical work queues consumed by this process.
///
/// Names are stable wire identifiers: they name the subscription on the
/// queue transport and must never be reused for a different work type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    /// Event ingestion batches
    Ingestion,
    /// Trace upserts that create evaluation jobs
    TraceUpsert,
    /// Evaluation job execution
    EvalExecution,
    /// Batch export generation
    BatchExport,
    /// Legacy ingestion pipeline
    LegacyIngestion,
    /// Cloud usage metering (billing)
    CloudUsageMetering,
}

impl QueueName {
    pub const ALL: [QueueName; 6] = [
        QueueName::Ingestion,
        QueueName::TraceUpsert,
        QueueName::EvalExecution,
        QueueName::BatchExport,
        QueueName::LegacyIngestion,
        QueueName::CloudUsageMetering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Ingestion => "ingestion",
            QueueName::TraceUpsert => "trace-upsert",
            QueueName::EvalExecution => "eval-execution",
            QueueName::BatchExport => "batch-export",
            QueueName::LegacyIngestion => "legacy-ingestion",
            QueueName::CloudUsageMetering => "cloud-usage-metering",
        }
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_names_are_unique() {
        for (i, a) in QueueName::ALL.iter().enumerate() {
            for b in QueueName::ALL.iter().skip(i + 1) {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }
}
