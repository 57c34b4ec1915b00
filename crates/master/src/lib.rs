//! # Multinet Master
//!
//! The master turns one operator command into one command per worker and
//! folds the answers back into a single verdict.
//!
//! ```text
//! operator ──► master POST /<cmd> ──► Broadcaster ──┬──► worker 0 POST /<cmd>
//!                                     (allocate     ├──► worker 1 POST /<cmd>
//!                                      dpids for    └──► worker N POST /<cmd>
//!                                      init)                 │
//!           ◄── 200/500 + [body, ...] ◄── aggregate ◄────────┘
//! ```
//!
//! There is no retry, no rollback and no cross-worker cancellation: a
//! failed worker shows up in its own slot and flips the aggregate status.

pub mod aggregate;
pub mod broadcast;
pub mod client;
pub mod operator;
pub mod outcome;
pub mod rpc;

pub use aggregate::{aggregate, AggregateResult, AggregateStatus};
pub use broadcast::{BroadcastConfig, BroadcastError, Broadcaster};
pub use client::{ClientError, MasterClient, MasterReply};
pub use operator::{exit_code, OperatorConfig, OperatorConfigError, WorkerRange};
pub use outcome::{Outcome, TransportFailure, WorkerOutcome, FAILURE_MARKER};
