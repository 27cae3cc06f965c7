//! Capacity aggregation over a single poll.
//!
//! Classifies each member of a group snapshot and counts those that are
//! in service, then those that are also healthy on every load-balancing
//! target the group is attached to.

use serde::{Deserialize, Serialize};
use tracing::debug;

use capwait_core::{AttachmentStates, AttachmentTarget, Group, Member};

const HEALTHY: &str = "Healthy";
const IN_SERVICE: &str = "InService";

/// Classification of one member in a group snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberHealth {
    /// Id, health or lifecycle state missing; the entry is skipped.
    Incomplete,
    /// Health status is not `Healthy`.
    Unhealthy,
    /// Healthy but lifecycle state is not `InService` (pending, terminating, ...).
    NotInService,
    /// Healthy and in service.
    InService,
}

impl MemberHealth {
    pub fn classify(member: &Member) -> Self {
        let (Some(_), Some(health), Some(lifecycle)) = (
            member.id.as_deref(),
            member.health_status.as_deref(),
            member.lifecycle_state.as_deref(),
        ) else {
            return MemberHealth::Incomplete;
        };

        if !health.eq_ignore_ascii_case(HEALTHY) {
            return MemberHealth::Unhealthy;
        }
        if !lifecycle.eq_ignore_ascii_case(IN_SERVICE) {
            return MemberHealth::NotInService;
        }
        MemberHealth::InService
    }

    pub fn counts(self) -> bool {
        self == MemberHealth::InService
    }
}

/// Whether a member is healthy on every one of `targets`.
///
/// A target missing from `states`, or with no entry for the member, or
/// with a state other than the target kind's healthy literal,
/// disqualifies the member. With no targets this is vacuously true.
pub fn is_attached_healthy(
    member_id: &str,
    targets: &[AttachmentTarget],
    states: &AttachmentStates,
) -> bool {
    targets.iter().all(|target| {
        states
            .states_for(target)
            .and_then(|members| members.get(member_id))
            .is_some_and(|state| state.eq_ignore_ascii_case(target.kind.healthy_literal()))
    })
}

/// Aggregate counts produced by one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityCounts {
    /// Healthy, in-service members of the group.
    pub members: u32,
    /// Of those, members healthy on all attached targets.
    pub attached_healthy: u32,
}

impl CapacityCounts {
    pub fn new(members: u32, attached_healthy: u32) -> Self {
        Self {
            members,
            attached_healthy,
        }
    }

    /// Count capacity for one snapshot. Nothing carries over between polls.
    pub fn tally(group: &Group, states: &AttachmentStates) -> Self {
        let targets = group.attachment_targets();
        let mut counts = CapacityCounts::default();

        for member in &group.members {
            let health = MemberHealth::classify(member);
            if !health.counts() {
                debug!(
                    group = %group.id,
                    member = member.id.as_deref().unwrap_or("<unknown>"),
                    ?health,
                    "member not counted"
                );
                continue;
            }

            counts.members += 1;

            // classify() guarantees the id is present for counted members.
            if let Some(id) = member.id.as_deref()
                && is_attached_healthy(id, &targets, states)
            {
                counts.attached_healthy += 1;
            }
        }

        counts
    }
}
