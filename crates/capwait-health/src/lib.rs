//! capwait-health — turns a group snapshot into capacity counts.
//!
//! Every poll recomputes two aggregates from scratch:
//!
//! ```text
//! members           = in-service, healthy members with all fields present
//! attached_healthy  = members that are also healthy on *every* attached target
//! ```
//!
//! Classic load balancers report `InService`, target groups report
//! `healthy`; both comparisons are case-insensitive. A group with no
//! attachment targets has `attached_healthy == members`.

pub mod tally;

pub use tally::{CapacityCounts, MemberHealth, is_attached_healthy};
