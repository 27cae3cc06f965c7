use std::path::Path;

use anyhow::Context;
use capwait_core::GroupWaitConfig;
use capwait_health::CapacityCounts;
use capwait_waiter::{Convergence, Decision, Evaluate, RecordedPoll};

use crate::CapacityMode;

/// Result of evaluating one snapshot.
#[derive(Debug, PartialEq, Eq)]
pub enum Report {
    /// The snapshot had no group.
    Missing,
    Evaluated {
        group: String,
        counts: CapacityCounts,
        decision: Decision,
    },
}

impl Report {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Report::Missing => serde_json::json!({
                "group": null,
                "satisfied": false,
                "reason": "group not found",
            }),
            Report::Evaluated { group, counts, decision } => serde_json::json!({
                "group": group,
                "members": counts.members,
                "attached_healthy": counts.attached_healthy,
                "satisfied": decision.is_satisfied(),
                "reason": decision.reason(),
            }),
        }
    }
}

pub fn evaluate(config: &str, snapshot: &str, mode: CapacityMode, format: &str) -> anyhow::Result<()> {
    let config = GroupWaitConfig::from_file(Path::new(config))?;
    let content = std::fs::read_to_string(snapshot)
        .with_context(|| format!("failed to read snapshot {snapshot}"))?;
    let poll: RecordedPoll = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot {snapshot}"))?;

    let report = evaluate_poll(&config, &poll, mode);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        }
        _ => print_text_report(&report),
    }

    Ok(())
}

/// Tally one recorded poll and apply the convergence rule for `mode`.
pub fn evaluate_poll(config: &GroupWaitConfig, poll: &RecordedPoll, mode: CapacityMode) -> Report {
    let Some(group) = &poll.group else {
        return Report::Missing;
    };

    let counts = CapacityCounts::tally(group, &poll.attachment_states());
    let evaluator = match mode {
        CapacityMode::Create => Convergence::create(config.bounds()),
        CapacityMode::Update => Convergence::update(config.bounds()),
    };

    Report::Evaluated {
        group: group.id.clone(),
        counts,
        decision: evaluator.evaluate(counts),
    }
}

fn print_text_report(report: &Report) {
    match report {
        Report::Missing => {
            println!("✗ Group not found in snapshot");
        }
        Report::Evaluated { group, counts, decision } => {
            println!("Group: {group}");
            println!("  Healthy members:  {}", counts.members);
            println!("  Attached healthy: {}", counts.attached_healthy);
            if decision.is_satisfied() {
                println!("✓ Capacity satisfied");
            } else {
                println!("✗ {}", decision.reason());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capwait_core::{AttachmentTarget, Group, Member};

    fn web_group(members: &[&str]) -> Group {
        let mut group = Group::new("web");
        group.members = members.iter().map(|id| Member::in_service(*id)).collect();
        group.load_balancers = vec!["web-elb".to_string()];
        group
    }

    fn config(toml: &str) -> GroupWaitConfig {
        GroupWaitConfig::from_toml_str(toml).unwrap()
    }

    #[test]
    fn creation_needs_attached_capacity() {
        let poll = RecordedPoll::group(web_group(&["i-1", "i-2"])).with_attachment(
            AttachmentTarget::classic("web-elb"),
            &[("i-1", "InService"), ("i-2", "OutOfService")],
        );
        let config = config("min_size = 2\nmin_elb_capacity = 2\n");

        let report = evaluate_poll(&config, &poll, CapacityMode::Create);

        let Report::Evaluated { counts, decision, .. } = report else {
            panic!("expected an evaluated report");
        };
        assert_eq!(counts, CapacityCounts::new(2, 1));
        assert_eq!(decision.reason(), "Need at least 2 healthy instances in ELB, have 1");
    }

    #[test]
    fn update_requires_exact_counts() {
        let poll = RecordedPoll::group(web_group(&["i-1", "i-2", "i-3"])).with_attachment(
            AttachmentTarget::classic("web-elb"),
            &[("i-1", "InService"), ("i-2", "InService"), ("i-3", "InService")],
        );
        let config = config("desired_capacity = 2\n");

        let create = evaluate_poll(&config, &poll, CapacityMode::Create);
        let update = evaluate_poll(&config, &poll, CapacityMode::Update);

        assert!(matches!(create, Report::Evaluated { ref decision, .. } if decision.is_satisfied()));
        assert!(matches!(update, Report::Evaluated { ref decision, .. } if !decision.is_satisfied()));
    }

    #[test]
    fn missing_group_is_reported() {
        let report = evaluate_poll(&GroupWaitConfig::default(), &RecordedPoll::absent(), CapacityMode::Create);
        assert_eq!(report, Report::Missing);
        assert_eq!(report.to_json()["satisfied"], false);
    }

    #[test]
    fn json_report_carries_counts() {
        let poll = RecordedPoll::group(web_group(&["i-1"]))
            .with_attachment(AttachmentTarget::classic("web-elb"), &[("i-1", "InService")]);

        let json = evaluate_poll(&config("min_size = 1\n"), &poll, CapacityMode::Create).to_json();

        assert_eq!(json["group"], "web");
        assert_eq!(json["members"], 1);
        assert_eq!(json["attached_healthy"], 1);
        assert_eq!(json["satisfied"], true);
        assert_eq!(json["reason"], "");
    }

    #[test]
    fn evaluate_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("group.toml");
        let snapshot_path = dir.path().join("poll.json");
        std::fs::write(&config_path, "min_size = 1\n").unwrap();
        std::fs::write(
            &snapshot_path,
            r#"{"group": {"id": "web", "members": [
                {"id": "i-1", "health_status": "Healthy", "lifecycle_state": "InService"}
            ]}}"#,
        )
        .unwrap();

        evaluate(
            config_path.to_str().unwrap(),
            snapshot_path.to_str().unwrap(),
            CapacityMode::Create,
            "json",
        )
        .unwrap();
    }

    #[test]
    fn evaluate_rejects_bad_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("group.toml");
        let snapshot_path = dir.path().join("poll.json");
        std::fs::write(&config_path, "").unwrap();
        std::fs::write(&snapshot_path, "not json").unwrap();

        let err = evaluate(
            config_path.to_str().unwrap(),
            snapshot_path.to_str().unwrap(),
            CapacityMode::Create,
            "text",
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to parse snapshot"));
    }
}
