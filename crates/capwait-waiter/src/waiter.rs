//! Capacity waiter — polls a group until its capacity converges.
//!
//! Each poll fetches a fresh group snapshot (and, in capacity mode, the
//! attachment states of every target the group references), recomputes
//! the aggregate counts and evaluates them. Nothing is carried over
//! between polls except the backoff schedule.
//!
//! The deadline is checked after every poll and again after every sleep,
//! and sleeps are clamped to the time remaining, so a wait never sleeps
//! past its timeout.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use capwait_core::{
    AttachmentStates, CapacityBounds, ConfigResult, GroupWaitConfig, format_duration,
};
use capwait_health::CapacityCounts;

use crate::clock::{Clock, TokioClock};
use crate::error::{WaitError, WaitResult};
use crate::evaluator::{Convergence, Decision, Evaluate};
use crate::provider::{AttachmentStateProvider, GroupSnapshotProvider};
use crate::schedule::PollPolicy;

/// How a wait ended.
#[derive(Debug)]
pub enum WaitOutcome {
    /// The evaluator was satisfied (or waiting was disabled with a zero timeout).
    Converged,
    /// The group no longer exists. Callers should treat the resource as gone.
    GroupDisappeared,
    /// The deadline passed; carries the last unsatisfied reason.
    TimedOut { reason: String },
    /// Aborted through the cancellation channel before a decision was reached.
    Cancelled,
    /// A fetch failed or the configuration was invalid.
    Failed(WaitError),
}

impl WaitOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, WaitOutcome::Converged)
    }

    pub fn label(&self) -> &'static str {
        match self {
            WaitOutcome::Converged => "converged",
            WaitOutcome::GroupDisappeared => "group_disappeared",
            WaitOutcome::TimedOut { .. } => "timed_out",
            WaitOutcome::Cancelled => "cancelled",
            WaitOutcome::Failed(_) => "failed",
        }
    }

    /// Collapse into a plain result for resource handlers.
    ///
    /// Group disappearance counts as success: the handler's own read
    /// will notice the resource is gone.
    pub fn into_result(self) -> WaitResult<()> {
        match self {
            WaitOutcome::Converged | WaitOutcome::GroupDisappeared => Ok(()),
            WaitOutcome::TimedOut { reason } => Err(WaitError::Timeout { reason }),
            WaitOutcome::Cancelled => Err(WaitError::Cancelled),
            WaitOutcome::Failed(e) => Err(e),
        }
    }
}

/// Which convergence rule a config-driven wait applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// At-least semantics for a newly created group.
    Create,
    /// Exact semantics after changing the group's size.
    Update,
    /// Raw member count must equal `want`, health ignored.
    ScaleDown { want: u32 },
}

/// Everything a wait needs, resolved from configuration up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitParams {
    pub timeout: Duration,
    pub bounds: CapacityBounds,
    pub policy: PollPolicy,
}

impl WaitParams {
    pub fn from_config(config: &GroupWaitConfig) -> ConfigResult<Self> {
        Ok(Self {
            timeout: config.timeout()?,
            bounds: config.bounds(),
            policy: PollPolicy::from_config(&config.poll())?,
        })
    }
}

/// What a single poll is checking for.
#[derive(Clone, Copy)]
enum Target<'a> {
    Capacity(&'a (dyn Evaluate + Sync)),
    ScaleDown(u32),
}

impl Target<'_> {
    fn label(&self) -> &'static str {
        match self {
            Target::Capacity(_) => "capacity",
            Target::ScaleDown(_) => "scale-down",
        }
    }
}

enum Step {
    Done(WaitOutcome),
    Pending(String),
}

/// Waits for an autoscaling group to reach a declared capacity.
pub struct CapacityWaiter<G, A, C = TokioClock> {
    groups: G,
    attachments: A,
    clock: C,
    policy: PollPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl<G, A> CapacityWaiter<G, A, TokioClock>
where
    G: GroupSnapshotProvider,
    A: AttachmentStateProvider,
{
    pub fn new(groups: G, attachments: A) -> Self {
        Self {
            groups,
            attachments,
            clock: TokioClock,
            policy: PollPolicy::default(),
            cancel: None,
        }
    }
}

impl<G, A, C> CapacityWaiter<G, A, C>
where
    G: GroupSnapshotProvider,
    A: AttachmentStateProvider,
    C: Clock,
{
    /// Replace the time source (e.g. a `ManualClock` in tests).
    pub fn with_clock<C2: Clock>(self, clock: C2) -> CapacityWaiter<G, A, C2> {
        CapacityWaiter {
            groups: self.groups,
            attachments: self.attachments,
            clock,
            policy: self.policy,
            cancel: self.cancel,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Abort the wait early once `true` is sent on this channel.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Wait until `evaluator` is satisfied by the group's healthy and
    /// attached-healthy counts, or `timeout` elapses.
    ///
    /// A zero timeout returns `Converged` without fetching anything.
    pub async fn wait_for_capacity<E>(
        &self,
        group_id: &str,
        timeout: Duration,
        evaluator: &E,
    ) -> WaitOutcome
    where
        E: Evaluate + Sync,
    {
        self.run(group_id, timeout, self.policy, Target::Capacity(evaluator))
            .await
    }

    /// Wait until the group has exactly `want` members, counting members
    /// in any lifecycle state (terminating members still count).
    ///
    /// Health and attachment state are not consulted.
    pub async fn wait_for_scale_down(
        &self,
        group_id: &str,
        timeout: Duration,
        want: u32,
    ) -> WaitOutcome {
        self.run(group_id, timeout, self.policy, Target::ScaleDown(want))
            .await
    }

    /// Resolve a resource configuration and wait according to `mode`.
    ///
    /// Configuration errors are returned as `Failed` before any fetch.
    /// The configuration's poll policy overrides the waiter's.
    pub async fn wait_with_config(
        &self,
        group_id: &str,
        config: &GroupWaitConfig,
        mode: WaitMode,
    ) -> WaitOutcome {
        let params = match WaitParams::from_config(config) {
            Ok(params) => params,
            Err(e) => {
                warn!(group = %group_id, error = %e, "invalid wait configuration");
                return WaitOutcome::Failed(WaitError::Config(e));
            }
        };

        match mode {
            WaitMode::Create => {
                let evaluator = Convergence::create(params.bounds);
                self.run(group_id, params.timeout, params.policy, Target::Capacity(&evaluator))
                    .await
            }
            WaitMode::Update => {
                let evaluator = Convergence::update(params.bounds);
                self.run(group_id, params.timeout, params.policy, Target::Capacity(&evaluator))
                    .await
            }
            WaitMode::ScaleDown { want } => {
                self.run(group_id, params.timeout, params.policy, Target::ScaleDown(want))
                    .await
            }
        }
    }

    async fn run(
        &self,
        group_id: &str,
        timeout: Duration,
        policy: PollPolicy,
        target: Target<'_>,
    ) -> WaitOutcome {
        if timeout.is_zero() {
            debug!(group = %group_id, "capacity timeout set to 0, skipping capacity waiting");
            return WaitOutcome::Converged;
        }

        let mode = target.label();
        info!(
            group = %group_id,
            mode,
            timeout = %format_duration(timeout),
            "waiting for capacity"
        );

        let deadline = self.clock.now() + timeout;
        let mut backoff = policy.backoff();
        let mut cancel = self.cancel.clone();
        let mut attempt: u32 = 0;

        loop {
            if is_cancelled(&cancel) {
                info!(group = %group_id, mode, attempt, "capacity wait cancelled");
                return WaitOutcome::Cancelled;
            }

            attempt += 1;
            let reason = match self.poll(group_id, target, attempt).await {
                Step::Done(outcome) => {
                    debug!(group = %group_id, mode, attempt, outcome = outcome.label(), "capacity wait finished");
                    return outcome;
                }
                Step::Pending(reason) => reason,
            };

            let now = self.clock.now();
            if now >= deadline {
                return timed_out(group_id, mode, timeout, attempt, &reason);
            }

            let delay = backoff.next_delay_within(deadline - now);
            tokio::select! {
                _ = self.clock.sleep(delay) => {}
                _ = cancelled(&mut cancel) => {
                    info!(group = %group_id, mode, attempt, "capacity wait cancelled");
                    return WaitOutcome::Cancelled;
                }
            }

            if self.clock.now() >= deadline {
                return timed_out(group_id, mode, timeout, attempt, &reason);
            }
        }
    }

    async fn poll(&self, group_id: &str, target: Target<'_>, attempt: u32) -> Step {
        let group = match self.groups.fetch_group(group_id).await {
            Ok(Some(group)) => group,
            Ok(None) => {
                info!(group = %group_id, "autoscaling group not found");
                return Step::Done(WaitOutcome::GroupDisappeared);
            }
            Err(source) => {
                warn!(group = %group_id, attempt, error = %source, "group fetch failed");
                return Step::Done(WaitOutcome::Failed(WaitError::FetchGroup {
                    group: group_id.to_string(),
                    source,
                }));
            }
        };

        match target {
            Target::ScaleDown(want) => {
                let have = u32::try_from(group.members.len()).unwrap_or(u32::MAX);
                if have == want {
                    debug!(group = %group_id, attempt, capacity = want, "capacity achieved");
                    return Step::Done(WaitOutcome::Converged);
                }
                debug!(group = %group_id, attempt, desired = want, got = have, "waiting for scale down");
                Step::Pending(format!("Need exactly {want} instances in ASG, have {have}"))
            }
            Target::Capacity(evaluator) => {
                let targets = group.attachment_targets();
                let states = if targets.is_empty() {
                    AttachmentStates::new()
                } else {
                    match self.attachments.fetch_attachment_states(&targets).await {
                        Ok(states) => states,
                        Err(source) => {
                            warn!(group = %group_id, attempt, error = %source, "attachment state fetch failed");
                            return Step::Done(WaitOutcome::Failed(WaitError::FetchAttachments {
                                group: group_id.to_string(),
                                source,
                            }));
                        }
                    }
                };

                let counts = CapacityCounts::tally(&group, &states);
                let decision = evaluator.evaluate(counts);

                debug!(
                    group = %group_id,
                    attempt,
                    members = counts.members,
                    attached_healthy = counts.attached_healthy,
                    satisfied = decision.is_satisfied(),
                    reason = decision.reason(),
                    "capacity"
                );

                match decision {
                    Decision::Satisfied => Step::Done(WaitOutcome::Converged),
                    Decision::Unsatisfied { reason } => Step::Pending(reason),
                }
            }
        }
    }
}

fn timed_out(
    group_id: &str,
    mode: &str,
    timeout: Duration,
    attempts: u32,
    reason: &str,
) -> WaitOutcome {
    let reason = format!(
        "{group_id:?}: Waiting up to {}: {reason}",
        format_duration(timeout)
    );
    warn!(group = %group_id, mode, attempts, %reason, "capacity wait timed out");
    WaitOutcome::TimedOut { reason }
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Resolves once cancellation is requested; never resolves without a
/// channel or after the sender is dropped.
async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = cancel
        && rx.wait_for(|stop| *stop).await.is_ok()
    {
        return;
    }
    std::future::pending::<()>().await
}
