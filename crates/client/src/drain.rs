//! Queue drain with one-shot credential refresh.
//!
//! One pass attempts every pending item in FIFO order. At most one
//! token-refresh exchange happens per pass: on the first expired-credential
//! failure the refresh credential is exchanged once and that item retried
//! once. A failed refresh marks items needing re-authentication and leaves
//! them queued; nothing is ever silently dropped. A second drain while one
//! is in flight is a no-op.

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use salescore_core::pipeline::EvaluationRequest;
use salescore_core::types::DbId;

use crate::queue::{QueueError, QueueStore, QueuedSubmission, SubmissionState};

/// Successful delivery of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOk {
    pub evaluation_id: DbId,
    /// The server already had this evaluation; no new row was written.
    pub duplicate: bool,
}

/// Delivery failure, classified by the recovery it permits.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Expired or invalid access credential; triggers the one-shot refresh.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The server recognized the submission as a recent duplicate.
    /// Success-equivalent; the prior id is carried when known.
    #[error("duplicate submission")]
    Duplicate { evaluation_id: Option<DbId> },
    /// Validation or authorization rejection. Never retried.
    #[error("rejected ({code}): {message}")]
    Rejected { code: String, message: String },
    /// Transport failure or server-side transient error. The item stays
    /// pending for the next drain.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Credential refresh failure.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The refresh credential itself is invalid or expired; only a fresh
    /// login can recover.
    #[error("refresh credential rejected: {0}")]
    Unauthorized(String),
    /// Transient failure; the credentials may still be good.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// A rotated token pair returned by a successful refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Delivers one submission to the server.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        access_token: &str,
        request: &EvaluationRequest,
    ) -> Result<SubmitOk, SubmitError>;
}

/// Exchanges a refresh credential for a new token pair. Single-use
/// rotation: the presented refresh token is invalidated by a successful
/// exchange.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError>;
}

/// Outcome of one drained item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Removed from the queue; the server holds the evaluation.
    Delivered {
        queue_id: Uuid,
        evaluation_id: Option<DbId>,
        duplicate: bool,
    },
    /// Removed from the queue; retrying can never succeed.
    Rejected {
        queue_id: Uuid,
        code: String,
        message: String,
    },
    /// Kept in the queue, marked for re-authentication.
    NeedsReauth { queue_id: Uuid },
    /// Kept pending; the drain will try again next time.
    Deferred { queue_id: Uuid },
}

/// Report of one drain pass.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// True when another drain was already in flight and this call did
    /// nothing.
    pub skipped: bool,
    pub outcomes: Vec<ItemOutcome>,
    /// Items still queued after the pass (pending or needs-reauth).
    pub remaining: usize,
}

/// The offline queue with its delivery policy.
///
/// Explicit and injectable: storage, transport, and credential exchange
/// are all trait objects supplied by the caller, so a drain is fully
/// deterministic in tests.
pub struct OfflineQueue<St, Su, Tx> {
    store: St,
    submitter: Su,
    exchanger: Tx,
    credentials: Mutex<TokenPair>,
    drain_lock: Mutex<()>,
}

impl<St, Su, Tx> OfflineQueue<St, Su, Tx>
where
    St: QueueStore,
    Su: Submitter,
    Tx: TokenExchanger,
{
    pub fn new(store: St, submitter: Su, exchanger: Tx, credentials: TokenPair) -> Self {
        Self {
            store,
            submitter,
            exchanger,
            credentials: Mutex::new(credentials),
            drain_lock: Mutex::new(()),
        }
    }

    /// Append a submission captured while offline. Returns its queue id.
    pub async fn enqueue(&self, request: EvaluationRequest) -> Result<Uuid, QueueError> {
        let item = QueuedSubmission::new(request);
        let id = item.id;
        self.store.append(item).await?;
        tracing::debug!(queue_id = %id, "submission enqueued");
        Ok(id)
    }

    /// Replace the credentials after a fresh login. Items parked as
    /// needs-reauth become pending again.
    pub async fn set_credentials(&self, credentials: TokenPair) -> Result<(), QueueError> {
        *self.credentials.lock().await = credentials;
        let parked: Vec<Uuid> = self
            .store
            .load()
            .await?
            .iter()
            .filter(|i| i.state == SubmissionState::NeedsReauth)
            .map(|i| i.id)
            .collect();
        if parked.is_empty() {
            return Ok(());
        }
        self.store.set_state(&parked, SubmissionState::Pending).await
    }

    /// One delivery pass over the queue, FIFO.
    ///
    /// A concurrent drain is a no-op (`skipped = true`); a drain works
    /// against the snapshot it loaded and removes only the ids it settled,
    /// so anything enqueued while it runs survives for the next pass.
    pub async fn drain(&self) -> Result<DrainReport, QueueError> {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            return Ok(DrainReport {
                skipped: true,
                ..Default::default()
            });
        };

        let items = self.store.load().await?;
        let mut report = DrainReport::default();
        let mut refresh_spent = false;
        let mut stop = false;
        let mut settled: Vec<Uuid> = Vec::new();
        let mut parked: Vec<Uuid> = Vec::new();

        for item in items {
            if stop || item.state != SubmissionState::Pending {
                continue;
            }

            let access = self.credentials.lock().await.access_token.clone();
            let mut result = self.submitter.submit(&access, &item.request).await;

            // One refresh exchange per pass: on the first expired
            // credential, rotate and retry this single item once.
            if matches!(result, Err(SubmitError::Unauthorized(_))) && !refresh_spent {
                refresh_spent = true;
                let refresh = self.credentials.lock().await.refresh_token.clone();
                match self.exchanger.refresh(&refresh).await {
                    Ok(pair) => {
                        let access = pair.access_token.clone();
                        *self.credentials.lock().await = pair;
                        tracing::info!("access credential refreshed during drain");
                        result = self.submitter.submit(&access, &item.request).await;
                    }
                    Err(RefreshError::Unauthorized(reason)) => {
                        tracing::warn!(%reason, "refresh credential rejected");
                        // Leave `result` as the unauthorized failure; the
                        // item is parked below.
                    }
                    Err(RefreshError::Unavailable(reason)) => {
                        tracing::warn!(%reason, "refresh exchange unavailable, deferring");
                        result = Err(SubmitError::Unavailable(reason));
                    }
                }
            }

            match result {
                Ok(ok) => {
                    settled.push(item.id);
                    report.outcomes.push(ItemOutcome::Delivered {
                        queue_id: item.id,
                        evaluation_id: Some(ok.evaluation_id),
                        duplicate: ok.duplicate,
                    });
                }
                Err(SubmitError::Duplicate { evaluation_id }) => {
                    settled.push(item.id);
                    report.outcomes.push(ItemOutcome::Delivered {
                        queue_id: item.id,
                        evaluation_id,
                        duplicate: true,
                    });
                }
                Err(SubmitError::Rejected { code, message }) => {
                    tracing::warn!(queue_id = %item.id, code, "submission rejected");
                    settled.push(item.id);
                    report.outcomes.push(ItemOutcome::Rejected {
                        queue_id: item.id,
                        code,
                        message,
                    });
                }
                Err(SubmitError::Unauthorized(_)) => {
                    parked.push(item.id);
                    report
                        .outcomes
                        .push(ItemOutcome::NeedsReauth { queue_id: item.id });
                }
                Err(SubmitError::Unavailable(reason)) => {
                    tracing::debug!(queue_id = %item.id, %reason, "server unavailable, stopping drain");
                    report
                        .outcomes
                        .push(ItemOutcome::Deferred { queue_id: item.id });
                    // Later items would only fail the same way, and
                    // delivering them first would break FIFO order.
                    stop = true;
                }
            }
        }

        if !settled.is_empty() {
            self.store.remove(&settled).await?;
        }
        if !parked.is_empty() {
            self.store
                .set_state(&parked, SubmissionState::NeedsReauth)
                .await?;
        }
        // Reload rather than count the snapshot: items enqueued during the
        // pass are still queued and belong in the count.
        report.remaining = self.store.load().await?.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use tokio::sync::Notify;

    use salescore_core::pipeline::ItemScoreInput;

    use super::*;
    use crate::queue::MemoryQueueStore;

    fn request(subject_id: DbId) -> EvaluationRequest {
        EvaluationRequest {
            subject_id,
            visit_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            customer_type: "retail".into(),
            customer_name: "Acme Market".into(),
            location: None,
            comment: None,
            items: vec![ItemScoreInput {
                behavior_item_id: 101,
                rating: 3,
                comment: None,
            }],
        }
    }

    fn creds() -> TokenPair {
        TokenPair {
            access_token: "access-0".into(),
            refresh_token: "refresh-0".into(),
        }
    }

    /// Submitter that plays back a scripted sequence of responses.
    #[derive(Default)]
    struct ScriptedSubmitter {
        script: Mutex<VecDeque<Result<SubmitOk, SubmitError>>>,
        calls: AtomicUsize,
        /// Subject ids in the order they were submitted.
        order: Mutex<Vec<DbId>>,
        /// When set, the first call parks until notified.
        hold_first: Option<Notify>,
    }

    impl ScriptedSubmitter {
        fn with(script: Vec<Result<SubmitOk, SubmitError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Submitter for ScriptedSubmitter {
        async fn submit(
            &self,
            _access_token: &str,
            request: &EvaluationRequest,
        ) -> Result<SubmitOk, SubmitError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                if let Some(hold) = &self.hold_first {
                    hold.notified().await;
                }
            }
            self.order.lock().await.push(request.subject_id);
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(SubmitError::Unavailable("script exhausted".into())))
        }
    }

    /// Exchanger returning a fixed outcome, counting calls.
    struct FixedExchanger {
        outcome: Result<(), ()>,
        calls: AtomicUsize,
    }

    impl FixedExchanger {
        fn ok() -> Self {
            Self {
                outcome: Ok(()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                outcome: Err(()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchanger for FixedExchanger {
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, RefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Ok(()) => Ok(TokenPair {
                    access_token: "access-1".into(),
                    refresh_token: "refresh-1".into(),
                }),
                Err(()) => Err(RefreshError::Unauthorized("refresh token expired".into())),
            }
        }
    }

    fn ok(evaluation_id: DbId) -> Result<SubmitOk, SubmitError> {
        Ok(SubmitOk {
            evaluation_id,
            duplicate: false,
        })
    }

    #[tokio::test]
    async fn drain_delivers_in_fifo_order_and_empties_the_queue() {
        let submitter = ScriptedSubmitter::with(vec![ok(1), ok(2), ok(3)]);
        let queue = OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::ok(),
            creds(),
        );
        for subject in [11, 12, 13] {
            queue.enqueue(request(subject)).await.unwrap();
        }

        let report = queue.drain().await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.remaining, 0);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(*queue.submitter.order.lock().await, vec![11, 12, 13]);
        assert!(queue.store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_response_counts_as_delivered() {
        let submitter = ScriptedSubmitter::with(vec![Err(SubmitError::Duplicate {
            evaluation_id: Some(7),
        })]);
        let queue = OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::ok(),
            creds(),
        );
        queue.enqueue(request(11)).await.unwrap();

        let report = queue.drain().await.unwrap();
        assert_eq!(report.remaining, 0);
        assert_matches!(
            &report.outcomes[0],
            ItemOutcome::Delivered {
                evaluation_id: Some(7),
                duplicate: true,
                ..
            }
        );
    }

    #[tokio::test]
    async fn expired_credential_refreshes_once_and_retries_the_item() {
        let submitter = ScriptedSubmitter::with(vec![
            Err(SubmitError::Unauthorized("token expired".into())),
            ok(1),
            ok(2),
        ]);
        let queue = OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::ok(),
            creds(),
        );
        queue.enqueue(request(11)).await.unwrap();
        queue.enqueue(request(12)).await.unwrap();

        let report = queue.drain().await.unwrap();
        assert_eq!(report.remaining, 0);
        assert_eq!(queue.exchanger.calls(), 1);
        // First item twice (expired then retried), second item once.
        assert_eq!(queue.submitter.calls(), 3);
        assert_eq!(queue.credentials.lock().await.access_token, "access-1");
    }

    #[tokio::test]
    async fn failed_refresh_marks_needs_reauth_and_keeps_the_item() {
        let submitter = ScriptedSubmitter::with(vec![Err(SubmitError::Unauthorized(
            "token expired".into(),
        ))]);
        let queue = OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::failing(),
            creds(),
        );
        let id = queue.enqueue(request(11)).await.unwrap();

        let report = queue.drain().await.unwrap();
        assert_eq!(queue.exchanger.calls(), 1);
        assert_eq!(report.remaining, 1);
        assert_matches!(&report.outcomes[0], ItemOutcome::NeedsReauth { queue_id } => {
            assert_eq!(*queue_id, id);
        });

        let items = queue.store.load().await.unwrap();
        assert_eq!(items[0].state, SubmissionState::NeedsReauth);

        // A second drain must not touch the parked item or refresh again.
        let report = queue.drain().await.unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(queue.exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn fresh_credentials_reactivate_parked_items() {
        let submitter = ScriptedSubmitter::with(vec![
            Err(SubmitError::Unauthorized("token expired".into())),
            ok(1),
        ]);
        let queue = OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::failing(),
            creds(),
        );
        queue.enqueue(request(11)).await.unwrap();
        queue.drain().await.unwrap();

        queue
            .set_credentials(TokenPair {
                access_token: "access-new".into(),
                refresh_token: "refresh-new".into(),
            })
            .await
            .unwrap();

        let report = queue.drain().await.unwrap();
        assert_eq!(report.remaining, 0);
        assert_matches!(&report.outcomes[0], ItemOutcome::Delivered { .. });
    }

    #[tokio::test]
    async fn rejection_is_reported_and_removed_without_retry() {
        let submitter = ScriptedSubmitter::with(vec![
            Err(SubmitError::Rejected {
                code: "FORBIDDEN".into(),
                message: "not permitted".into(),
            }),
            ok(2),
        ]);
        let queue = OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::ok(),
            creds(),
        );
        queue.enqueue(request(11)).await.unwrap();
        queue.enqueue(request(12)).await.unwrap();

        let report = queue.drain().await.unwrap();
        assert_eq!(report.remaining, 0);
        assert_matches!(&report.outcomes[0], ItemOutcome::Rejected { code, .. } => {
            assert_eq!(code, "FORBIDDEN");
        });
        assert_matches!(&report.outcomes[1], ItemOutcome::Delivered { .. });
    }

    #[tokio::test]
    async fn unavailable_stops_the_pass_and_keeps_order() {
        let submitter = ScriptedSubmitter::with(vec![Err(SubmitError::Unavailable(
            "connection refused".into(),
        ))]);
        let queue = OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::ok(),
            creds(),
        );
        queue.enqueue(request(11)).await.unwrap();
        queue.enqueue(request(12)).await.unwrap();

        let report = queue.drain().await.unwrap();
        assert_eq!(report.remaining, 2);
        // Only the first item was attempted; the second would have jumped
        // the line.
        assert_eq!(queue.submitter.calls(), 1);
        assert_matches!(&report.outcomes[0], ItemOutcome::Deferred { .. });
    }

    #[tokio::test]
    async fn concurrent_drain_is_a_noop() {
        let submitter = ScriptedSubmitter {
            script: Mutex::new(VecDeque::from([ok(1)])),
            hold_first: Some(Notify::new()),
            ..Default::default()
        };
        let queue = std::sync::Arc::new(OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::ok(),
            creds(),
        ));
        queue.enqueue(request(11)).await.unwrap();

        let first = tokio::spawn({
            let queue = queue.clone();
            async move { queue.drain().await.unwrap() }
        });
        // Let the first drain reach the parked submit call.
        tokio::task::yield_now().await;

        let second = queue.drain().await.unwrap();
        assert!(second.skipped);

        queue.submitter.hold_first.as_ref().unwrap().notify_one();
        let first = first.await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.remaining, 0);
    }

    #[tokio::test]
    async fn item_enqueued_during_a_drain_survives_the_pass() {
        let submitter = ScriptedSubmitter {
            script: Mutex::new(VecDeque::from([ok(1), ok(2)])),
            hold_first: Some(Notify::new()),
            ..Default::default()
        };
        let queue = std::sync::Arc::new(OfflineQueue::new(
            MemoryQueueStore::default(),
            submitter,
            FixedExchanger::ok(),
            creds(),
        ));
        queue.enqueue(request(11)).await.unwrap();

        let drain = tokio::spawn({
            let queue = queue.clone();
            async move { queue.drain().await.unwrap() }
        });
        // Let the drain load its snapshot and park inside the submit call,
        // then enqueue a second item behind its back.
        tokio::task::yield_now().await;
        let late_id = queue.enqueue(request(12)).await.unwrap();
        queue.submitter.hold_first.as_ref().unwrap().notify_one();

        let report = drain.await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.remaining, 1);

        // The late item is still queued and pending, not clobbered by the
        // finishing drain.
        let items = queue.store.load().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, late_id);
        assert_eq!(items[0].state, SubmissionState::Pending);

        // The next pass delivers it.
        let report = queue.drain().await.unwrap();
        assert_eq!(report.remaining, 0);
        assert_matches!(&report.outcomes[0], ItemOutcome::Delivered { queue_id, .. } => {
            assert_eq!(*queue_id, late_id);
        });
    }
}
