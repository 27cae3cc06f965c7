//! capwait-waiter — block until an autoscaling group reaches capacity.
//!
//! The waiter repeatedly snapshots a group and its load-balancer
//! attachments, aggregates capacity counts, and asks an evaluator whether
//! the caller's declared capacity has been reached.
//!
//! # Architecture
//!
//! ```text
//! CapacityWaiter
//!   ├── GroupSnapshotProvider::fetch_group()        → Group | absent
//!   ├── AttachmentStateProvider::fetch_attachment_states()
//!   ├── CapacityCounts::tally()                     → (members, attached_healthy)
//!   ├── Evaluate::evaluate()                        → Satisfied | Unsatisfied(reason)
//!   └── Backoff + Clock                             → sleep or give up at the deadline
//! ```
//!
//! # Outcomes
//!
//! A wait ends `Converged`, `GroupDisappeared`, `TimedOut` (with the last
//! unsatisfied reason), `Cancelled`, or `Failed`. Fetch failures are never
//! retried by the waiter; a zero timeout returns `Converged` without
//! fetching anything.

pub mod clock;
pub mod error;
pub mod evaluator;
pub mod provider;
pub mod recorded;
pub mod schedule;
pub mod waiter;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{WaitError, WaitResult};
pub use evaluator::{Convergence, CreationEvaluator, Decision, Evaluate, UpdateEvaluator};
pub use provider::{AttachmentStateProvider, GroupSnapshotProvider};
pub use recorded::{AttachmentRecord, RecordedPoll, RecordedPolls};
pub use schedule::{Backoff, PollPolicy};
pub use waiter::{CapacityWaiter, WaitMode, WaitOutcome, WaitParams};
