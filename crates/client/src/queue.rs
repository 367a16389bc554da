//! Durable submission queue.
//!
//! The queue is an explicit, injectable structure: storage lives behind
//! [`QueueStore`] so tests run against memory and the app against a JSON
//! file, with identical semantics either way.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use salescore_core::pipeline::EvaluationRequest;
use salescore_core::types::Timestamp;

/// Lifecycle of one queued submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Awaiting delivery on the next drain.
    Pending,
    /// Delivery hit an expired credential and the refresh exchange failed;
    /// the item stays queued until the user re-authenticates.
    NeedsReauth,
}

/// One evaluation captured while offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedSubmission {
    pub id: Uuid,
    pub request: EvaluationRequest,
    pub state: SubmissionState,
    pub enqueued_at: Timestamp,
}

impl QueuedSubmission {
    pub fn new(request: EvaluationRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: SubmissionState::Pending,
            enqueued_at: chrono::Utc::now(),
        }
    }
}

/// Queue persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue store error: {0}")]
    Store(String),
}

/// Durable storage for the queue.
///
/// Mutations are granular and each one is atomic with respect to the
/// others: a drain removes exactly the ids it delivered, so an item
/// appended while a drain is in flight can never be overwritten by the
/// drain finishing. Items not named by `remove`/`set_state` are untouched.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Snapshot of the queue, FIFO order.
    async fn load(&self) -> Result<Vec<QueuedSubmission>, QueueError>;
    /// Append one item at the tail.
    async fn append(&self, item: QueuedSubmission) -> Result<(), QueueError>;
    /// Delete the items with the given ids. Unknown ids are ignored.
    async fn remove(&self, ids: &[Uuid]) -> Result<(), QueueError>;
    /// Set the state of the items with the given ids. Unknown ids are
    /// ignored.
    async fn set_state(&self, ids: &[Uuid], state: SubmissionState) -> Result<(), QueueError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<QueuedSubmission>>,
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self) -> Result<Vec<QueuedSubmission>, QueueError> {
        Ok(self.items.lock().await.clone())
    }

    async fn append(&self, item: QueuedSubmission) -> Result<(), QueueError> {
        self.items.lock().await.push(item);
        Ok(())
    }

    async fn remove(&self, ids: &[Uuid]) -> Result<(), QueueError> {
        self.items.lock().await.retain(|i| !ids.contains(&i.id));
        Ok(())
    }

    async fn set_state(&self, ids: &[Uuid], state: SubmissionState) -> Result<(), QueueError> {
        for item in self.items.lock().await.iter_mut() {
            if ids.contains(&item.id) {
                item.state = state;
            }
        }
        Ok(())
    }
}

/// File-backed store: the queue is one JSON document, rewritten under an
/// internal lock so each mutation is a whole read-modify-write. Good
/// enough for the handful of submissions a disconnected day produces.
pub struct JsonFileQueueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileQueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Vec<QueuedSubmission>, QueueError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| QueueError::Store(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(QueueError::Store(e.to_string())),
        }
    }

    async fn write_all(&self, items: &[QueuedSubmission]) -> Result<(), QueueError> {
        let bytes =
            serde_json::to_vec_pretty(items).map_err(|e| QueueError::Store(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| QueueError::Store(e.to_string()))
    }
}

#[async_trait]
impl QueueStore for JsonFileQueueStore {
    async fn load(&self) -> Result<Vec<QueuedSubmission>, QueueError> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }

    async fn append(&self, item: QueuedSubmission) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        items.push(item);
        self.write_all(&items).await
    }

    async fn remove(&self, ids: &[Uuid]) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        items.retain(|i| !ids.contains(&i.id));
        self.write_all(&items).await
    }

    async fn set_state(&self, ids: &[Uuid], state: SubmissionState) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        for item in &mut items {
            if ids.contains(&item.id) {
                item.state = state;
            }
        }
        self.write_all(&items).await
    }
}
