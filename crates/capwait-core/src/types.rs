//! Domain types for capacity waiting.
//!
//! A `Group` is a point-in-time snapshot of an externally owned
//! autoscaling group. Field aliases follow the autoscaling API's
//! PascalCase names so recorded describe responses deserialize as-is.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an autoscaling group.
pub type GroupId = String;

/// Identifier of a group member (an instance id).
pub type MemberId = String;

/// Identifier of a load-balancing target (ELB name or target group ARN).
pub type TargetId = String;

// ── Group ─────────────────────────────────────────────────────────

/// One member of a group as reported by the group snapshot.
///
/// Every field may be missing from the upstream response. A member with
/// any field absent is unusable and never counts toward capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, alias = "InstanceId")]
    pub id: Option<MemberId>,
    #[serde(default, alias = "HealthStatus")]
    pub health_status: Option<String>,
    #[serde(default, alias = "LifecycleState")]
    pub lifecycle_state: Option<String>,
}

impl Member {
    /// A fully populated member.
    pub fn new(id: &str, health_status: &str, lifecycle_state: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            health_status: Some(health_status.to_string()),
            lifecycle_state: Some(lifecycle_state.to_string()),
        }
    }

    /// A healthy, in-service member.
    pub fn in_service(id: &str) -> Self {
        Self::new(id, "Healthy", "InService")
    }
}

/// Snapshot of an autoscaling group and the targets it is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(alias = "AutoScalingGroupName")]
    pub id: GroupId,
    #[serde(default, alias = "Instances")]
    pub members: Vec<Member>,
    /// Classic load balancer names.
    #[serde(default, alias = "LoadBalancerNames")]
    pub load_balancers: Vec<TargetId>,
    /// Target group ARNs.
    #[serde(default, alias = "TargetGroupARNs")]
    pub target_groups: Vec<TargetId>,
}

impl Group {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// All attachment targets: classic load balancers first, then target groups.
    pub fn attachment_targets(&self) -> Vec<AttachmentTarget> {
        self.load_balancers
            .iter()
            .map(|id| AttachmentTarget::classic(id))
            .chain(
                self.target_groups
                    .iter()
                    .map(|id| AttachmentTarget::target_group(id)),
            )
            .collect()
    }
}

// ── Attachments ───────────────────────────────────────────────────

/// Flavor of load-balancing target. Each flavor reports member health
/// with its own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Classic load balancer.
    Classic,
    /// Application/network load balancer target group.
    TargetGroup,
}

impl AttachmentKind {
    /// State string (compared case-insensitively) meaning "healthy" for this flavor.
    pub fn healthy_literal(self) -> &'static str {
        match self {
            AttachmentKind::Classic => "InService",
            AttachmentKind::TargetGroup => "healthy",
        }
    }
}

/// A load-balancing endpoint members may be registered with.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttachmentTarget {
    pub kind: AttachmentKind,
    pub id: TargetId,
}

impl AttachmentTarget {
    pub fn classic(id: &str) -> Self {
        Self {
            kind: AttachmentKind::Classic,
            id: id.to_string(),
        }
    }

    pub fn target_group(id: &str) -> Self {
        Self {
            kind: AttachmentKind::TargetGroup,
            id: id.to_string(),
        }
    }
}

impl fmt::Display for AttachmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AttachmentKind::Classic => write!(f, "elb:{}", self.id),
            AttachmentKind::TargetGroup => write!(f, "tg:{}", self.id),
        }
    }
}

/// Per-target view of member health: target → (member id → state string).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentStates {
    targets: BTreeMap<AttachmentTarget, BTreeMap<MemberId, String>>,
}

impl AttachmentStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a member's state on a target, creating the target entry if needed.
    pub fn insert(&mut self, target: &AttachmentTarget, member: &str, state: &str) {
        self.targets
            .entry(target.clone())
            .or_default()
            .insert(member.to_string(), state.to_string());
    }

    /// Register a target with no member states yet.
    pub fn add_target(&mut self, target: &AttachmentTarget) {
        self.targets.entry(target.clone()).or_default();
    }

    /// Member states reported by one target.
    pub fn states_for(&self, target: &AttachmentTarget) -> Option<&BTreeMap<MemberId, String>> {
        self.targets.get(target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

// ── Bounds ────────────────────────────────────────────────────────

/// Capacity the caller declared. Zero means "no requirement".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityBounds {
    /// Minimum group size (`min_size`).
    pub min_members: u32,
    /// Desired group size (`desired_capacity`).
    pub desired_members: u32,
    /// Minimum healthy attached members (`min_elb_capacity`).
    pub min_attached: u32,
    /// Desired healthy attached members (`wait_for_elb_capacity`).
    pub desired_attached: u32,
}

impl CapacityBounds {
    /// Desired member count when positive, otherwise the minimum.
    pub fn effective_min_members(&self) -> u32 {
        if self.desired_members > 0 {
            self.desired_members
        } else {
            self.min_members
        }
    }

    /// Desired attached count when positive, otherwise the minimum.
    pub fn effective_min_attached(&self) -> u32 {
        if self.desired_attached > 0 {
            self.desired_attached
        } else {
            self.min_attached
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_targets_lists_classic_then_target_groups() {
        let group = Group {
            load_balancers: vec!["web".to_string()],
            target_groups: vec!["arn:tg/a".to_string(), "arn:tg/b".to_string()],
            ..Group::new("asg")
        };

        let targets = group.attachment_targets();
        assert_eq!(
            targets,
            vec![
                AttachmentTarget::classic("web"),
                AttachmentTarget::target_group("arn:tg/a"),
                AttachmentTarget::target_group("arn:tg/b"),
            ]
        );
    }

    #[test]
    fn healthy_literal_per_kind() {
        assert_eq!(AttachmentKind::Classic.healthy_literal(), "InService");
        assert_eq!(AttachmentKind::TargetGroup.healthy_literal(), "healthy");
    }

    #[test]
    fn group_deserializes_from_describe_response_shape() {
        let json = r#"{
            "AutoScalingGroupName": "web-asg",
            "Instances": [
                {"InstanceId": "i-1", "HealthStatus": "Healthy", "LifecycleState": "InService"},
                {"InstanceId": "i-2", "LifecycleState": "Pending"}
            ],
            "LoadBalancerNames": ["web-elb"],
            "TargetGroupARNs": []
        }"#;

        let group: Group = serde_json::from_str(json).unwrap();
        assert_eq!(group.id, "web-asg");
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.members[0], Member::in_service("i-1"));
        assert_eq!(group.members[1].health_status, None);
        assert_eq!(group.load_balancers, vec!["web-elb".to_string()]);
    }

    #[test]
    fn effective_minimums_prefer_positive_desired() {
        let bounds = CapacityBounds {
            min_members: 2,
            desired_members: 5,
            min_attached: 1,
            desired_attached: 0,
        };
        assert_eq!(bounds.effective_min_members(), 5);
        assert_eq!(bounds.effective_min_attached(), 1);
    }

    #[test]
    fn attachment_states_track_registered_targets() {
        let elb = AttachmentTarget::classic("web");
        let tg = AttachmentTarget::target_group("arn:tg/a");

        let mut states = AttachmentStates::new();
        states.insert(&elb, "i-1", "InService");
        states.add_target(&tg);

        assert_eq!(states.len(), 2);
        assert_eq!(
            states.states_for(&elb).and_then(|m| m.get("i-1")).map(String::as_str),
            Some("InService")
        );
        assert!(states.states_for(&tg).is_some_and(|m| m.is_empty()));
    }
}
