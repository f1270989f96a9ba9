//! In-memory audit store

use super::r#trait::AuditStore;
use crate::error::StoreError;
use crate::event::ToolExecutionEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: ToolExecutionEvent,
    pub significance: f32,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only event log kept in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditStore {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(
        &self,
        event: &ToolExecutionEvent,
        significance: f32,
    ) -> Result<(), StoreError> {
        self.records.write().await.push(AuditRecord {
            event: event.clone(),
            significance,
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}
