use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use capwait_core::{GroupWaitConfig, format_duration};
use capwait_waiter::{CapacityWaiter, ManualClock, RecordedPoll, RecordedPolls, WaitMode, WaitOutcome};

use crate::ReplayMode;

/// What happened during a replayed wait.
#[derive(Debug)]
pub struct ReplaySummary {
    pub group: String,
    pub outcome: WaitOutcome,
    /// Virtual time spent waiting.
    pub elapsed: Duration,
    pub polls: usize,
    pub sleeps: Vec<Duration>,
}

pub async fn replay(
    config: &str,
    polls: &str,
    group: Option<&str>,
    mode: ReplayMode,
    want: Option<u32>,
) -> anyhow::Result<()> {
    let config = GroupWaitConfig::from_file(Path::new(config))?;
    let content = std::fs::read_to_string(polls)
        .with_context(|| format!("failed to read recorded polls {polls}"))?;
    let recorded: Vec<RecordedPoll> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse recorded polls {polls}"))?;

    let group_id = match group {
        Some(id) => id.to_string(),
        None => recorded
            .iter()
            .find_map(|poll| poll.group.as_ref().map(|group| group.id.clone()))
            .context("no group id in recorded polls; pass --group")?,
    };

    let summary = run_replay(&config, recorded, &group_id, wait_mode(mode, want, &config)).await;
    print_summary(&summary);

    summary.outcome.into_result()?;
    Ok(())
}

/// Scale-down waits for `want`, falling back to the configured desired capacity.
pub fn wait_mode(mode: ReplayMode, want: Option<u32>, config: &GroupWaitConfig) -> WaitMode {
    match mode {
        ReplayMode::Create => WaitMode::Create,
        ReplayMode::Update => WaitMode::Update,
        ReplayMode::ScaleDown => WaitMode::ScaleDown {
            want: want.unwrap_or(config.desired_capacity),
        },
    }
}

/// Drive a full wait over recorded polls on a virtual clock.
pub async fn run_replay(
    config: &GroupWaitConfig,
    recorded: Vec<RecordedPoll>,
    group_id: &str,
    mode: WaitMode,
) -> ReplaySummary {
    let polls = RecordedPolls::new(recorded);
    let clock = ManualClock::new();

    let outcome = CapacityWaiter::new(&polls, &polls)
        .with_clock(clock.clone())
        .wait_with_config(group_id, config, mode)
        .await;

    ReplaySummary {
        group: group_id.to_string(),
        outcome,
        elapsed: clock.elapsed(),
        polls: polls.group_fetches(),
        sleeps: clock.sleeps(),
    }
}

fn print_summary(summary: &ReplaySummary) {
    let when = format!(
        "after {} poll(s), {} virtual",
        summary.polls,
        format_duration(summary.elapsed)
    );

    match &summary.outcome {
        WaitOutcome::Converged => println!("✓ {}: capacity reached {when}", summary.group),
        WaitOutcome::GroupDisappeared => println!("- {}: group disappeared {when}", summary.group),
        WaitOutcome::TimedOut { reason } => println!("✗ timed out {when}: {reason}"),
        WaitOutcome::Cancelled => println!("✗ {}: cancelled {when}", summary.group),
        WaitOutcome::Failed(e) => println!("✗ {}: failed {when}: {e}", summary.group),
    }

    if !summary.sleeps.is_empty() {
        let sleeps: Vec<String> = summary.sleeps.iter().map(|d| format_duration(*d)).collect();
        println!("  Sleeps: {}", sleeps.join(", "));
    }
}
