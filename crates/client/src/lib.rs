//! Offline companion for the evaluation API.
//!
//! Evaluations created without connectivity are held in a durable FIFO
//! queue ([`queue`]) and replayed by [`drain`]. Delivery is at-least-once
//! from this side; the server's duplicate suppression turns it into
//! at-most-once effect. An expired access credential triggers exactly one
//! refresh exchange per drain, never an unbounded retry loop.

pub mod drain;
pub mod http;
pub mod queue;

pub use drain::{
    DrainReport, ItemOutcome, OfflineQueue, RefreshError, SubmitError, SubmitOk, Submitter,
    TokenExchanger, TokenPair,
};
pub use http::{HttpSubmitter, HttpTokenExchanger};
pub use queue::{
    JsonFileQueueStore, MemoryQueueStore, QueueError, QueueStore, QueuedSubmission,
    SubmissionState,
};
