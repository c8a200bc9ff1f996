//! Status reporting contract and an in-memory implementation.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-subsystem completion flags for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub graph_upserted: bool,
    pub vector_upserted: bool,
    pub llm_enriched: bool,
    /// Every required subsystem finished.
    pub done: bool,
}

/// Where processing outcomes are recorded (typically the ingest queue's
/// status table).
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn mark_skipped(&self, event_id: &str, reason: &str) -> Result<()>;

    async fn mark_processed(&self, event_id: &str, status: &ProcessingStatus) -> Result<()>;

    async fn mark_failed(
        &self,
        event_id: &str,
        errors: &[String],
        retry_count: Option<u32>,
    ) -> Result<()>;
}

#[async_trait]
impl<W: StatusWriter + ?Sized> StatusWriter for Arc<W> {
    async fn mark_skipped(&self, event_id: &str, reason: &str) -> Result<()> {
        (**self).mark_skipped(event_id, reason).await
    }

    async fn mark_processed(&self, event_id: &str, status: &ProcessingStatus) -> Result<()> {
        (**self).mark_processed(event_id, status).await
    }

    async fn mark_failed(
        &self,
        event_id: &str,
        errors: &[String],
        retry_count: Option<u32>,
    ) -> Result<()> {
        (**self).mark_failed(event_id, errors, retry_count).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRecord {
    Skipped {
        event_id: String,
        reason: String,
    },
    Processed {
        event_id: String,
        status: ProcessingStatus,
    },
    Failed {
        event_id: String,
        errors: Vec<String>,
        retry_count: Option<u32>,
    },
}

impl StatusRecord {
    pub fn event_id(&self) -> &str {
        match self {
            StatusRecord::Skipped { event_id, .. }
            | StatusRecord::Processed { event_id, .. }
            | StatusRecord::Failed { event_id, .. } => event_id,
        }
    }
}

/// Records every call in order. Thread-safe.
#[derive(Debug, Default)]
pub struct MemoryStatusWriter {
    records: Mutex<Vec<StatusRecord>>,
}

impl MemoryStatusWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far (for test assertions).
    pub fn records(&self) -> Vec<StatusRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, record: StatusRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[async_trait]
impl StatusWriter for MemoryStatusWriter {
    async fn mark_skipped(&self, event_id: &str, reason: &str) -> Result<()> {
        self.push(StatusRecord::Skipped {
            event_id: event_id.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn mark_processed(&self, event_id: &str, status: &ProcessingStatus) -> Result<()> {
        self.push(StatusRecord::Processed {
            event_id: event_id.to_string(),
            status: *status,
        });
        Ok(())
    }

    async fn mark_failed(
        &self,
        event_id: &str,
        errors: &[String],
        retry_count: Option<u32>,
    ) -> Result<()> {
        self.push(StatusRecord::Failed {
            event_id: event_id.to_string(),
            errors: errors.to_vec(),
            retry_count,
        });
        Ok(())
    }
}
