//! Recorded poll sequences.
//!
//! `RecordedPolls` plays back a fixed list of group snapshots and
//! attachment states, one entry per poll. Once the list is exhausted the
//! last entry repeats. It implements both provider traits, so a single
//! value can drive a whole wait offline.
//!
//! ```json
//! [
//!   { "group": { "id": "web", "members": [] } },
//!   { "group": { "id": "web", "members": [ ... ], "load_balancers": ["web-elb"] },
//!     "attachments": [ { "kind": "classic", "id": "web-elb", "states": { "i-1": "InService" } } ] },
//!   { "group": null },
//!   { "error": "throttled" }
//! ]
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use capwait_core::{AttachmentKind, AttachmentStates, AttachmentTarget, Group, MemberId};

use crate::provider::{AttachmentStateProvider, GroupSnapshotProvider};

/// One target's member states within a recorded poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub kind: AttachmentKind,
    pub id: String,
    #[serde(default)]
    pub states: BTreeMap<MemberId, String>,
}

/// What the providers report for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedPoll {
    /// `None` (or `null`) means the group is gone.
    #[serde(default)]
    pub group: Option<Group>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
    /// Fail the group fetch with this message.
    #[serde(default)]
    pub error: Option<String>,
    /// Fail the attachment fetch with this message.
    #[serde(default)]
    pub attachment_error: Option<String>,
}

impl RecordedPoll {
    pub fn group(group: Group) -> Self {
        Self {
            group: Some(group),
            ..Default::default()
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_attachment(mut self, target: AttachmentTarget, states: &[(&str, &str)]) -> Self {
        self.attachments.push(AttachmentRecord {
            kind: target.kind,
            id: target.id,
            states: states
                .iter()
                .map(|(member, state)| (member.to_string(), state.to_string()))
                .collect(),
        });
        self
    }

    pub fn attachment_states(&self) -> AttachmentStates {
        let mut states = AttachmentStates::new();
        for record in &self.attachments {
            let target = AttachmentTarget {
                kind: record.kind,
                id: record.id.clone(),
            };
            // A target that reports no members is still a known target.
            states.add_target(&target);
            for (member, state) in &record.states {
                states.insert(&target, member, state);
            }
        }
        states
    }
}

/// Plays back recorded polls; counts fetches for inspection.
#[derive(Debug, Default)]
pub struct RecordedPolls {
    polls: Vec<RecordedPoll>,
    /// Index of the poll served by the latest group fetch.
    current: AtomicUsize,
    group_fetches: AtomicUsize,
    attachment_fetches: AtomicUsize,
}

impl RecordedPolls {
    pub fn new(polls: Vec<RecordedPoll>) -> Self {
        Self {
            polls,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn group_fetches(&self) -> usize {
        self.group_fetches.load(Ordering::SeqCst)
    }

    pub fn attachment_fetches(&self) -> usize {
        self.attachment_fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }

    fn current(&self) -> Option<&RecordedPoll> {
        self.polls.get(self.current.load(Ordering::SeqCst))
    }
}

impl GroupSnapshotProvider for RecordedPolls {
    async fn fetch_group(&self, group_id: &str) -> anyhow::Result<Option<Group>> {
        let fetch = self.group_fetches.fetch_add(1, Ordering::SeqCst);
        let last = self
            .polls
            .len()
            .checked_sub(1)
            .ok_or_else(|| anyhow!("no recorded polls for group {group_id:?}"))?;
        let index = fetch.min(last);
        self.current.store(index, Ordering::SeqCst);

        let poll = &self.polls[index];
        if let Some(message) = &poll.error {
            return Err(anyhow!("{message}"));
        }
        Ok(poll.group.clone())
    }
}

impl AttachmentStateProvider for RecordedPolls {
    async fn fetch_attachment_states(
        &self,
        _targets: &[AttachmentTarget],
    ) -> anyhow::Result<AttachmentStates> {
        self.attachment_fetches.fetch_add(1, Ordering::SeqCst);

        let poll = self
            .current()
            .ok_or_else(|| anyhow!("attachment states requested before any group fetch"))?;
        if let Some(message) = &poll.attachment_error {
            return Err(anyhow!("{message}"));
        }
        Ok(poll.attachment_states())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capwait_core::Member;

    #[tokio::test]
    async fn last_poll_repeats() {
        let polls = RecordedPolls::new(vec![
            RecordedPoll::absent(),
            RecordedPoll::group(Group::new("web")),
        ]);

        assert!(polls.fetch_group("web").await.unwrap().is_none());
        assert!(polls.fetch_group("web").await.unwrap().is_some());
        assert!(polls.fetch_group("web").await.unwrap().is_some());
        assert_eq!(polls.group_fetches(), 3);
    }

    #[tokio::test]
    async fn empty_recording_is_an_error() {
        let polls = RecordedPolls::new(Vec::new());
        assert!(polls.fetch_group("web").await.is_err());
    }

    #[tokio::test]
    async fn attachment_states_follow_current_poll() {
        let elb = AttachmentTarget::classic("web-elb");
        let polls = RecordedPolls::new(vec![
            RecordedPoll::group(Group::new("web")).with_attachment(elb.clone(), &[("i-1", "OutOfService")]),
            RecordedPoll::group(Group::new("web")).with_attachment(elb.clone(), &[("i-1", "InService")]),
        ]);

        polls.fetch_group("web").await.unwrap();
        let states = polls.fetch_attachment_states(&[elb.clone()]).await.unwrap();
        assert_eq!(states.states_for(&elb).unwrap()["i-1"], "OutOfService");

        polls.fetch_group("web").await.unwrap();
        let states = polls.fetch_attachment_states(&[elb.clone()]).await.unwrap();
        assert_eq!(states.states_for(&elb).unwrap()["i-1"], "InService");
        assert_eq!(polls.attachment_fetches(), 2);
    }

    #[test]
    fn silent_target_is_still_reported() {
        let tg = AttachmentTarget::target_group("arn:tg/web");
        let poll = RecordedPoll::group(Group::new("web")).with_attachment(tg.clone(), &[]);

        let states = poll.attachment_states();
        assert_eq!(states.len(), 1);
        assert!(states.states_for(&tg).is_some_and(|members| members.is_empty()));
    }

    #[test]
    fn parses_recorded_json() {
        let json = r#"[
            {"group": {"id": "web", "members": [
                {"id": "i-1", "health_status": "Healthy", "lifecycle_state": "InService"}
            ], "target_groups": ["arn:tg/web"]},
             "attachments": [{"kind": "target_group", "id": "arn:tg/web", "states": {"i-1": "healthy"}}]},
            {"group": null},
            {"error": "Throttling: Rate exceeded"}
        ]"#;

        let polls = RecordedPolls::from_json(json).unwrap();
        assert_eq!(polls.len(), 3);
        assert_eq!(
            polls.polls[0].group.as_ref().unwrap().members[0],
            Member::in_service("i-1")
        );
        assert_eq!(polls.polls[0].attachment_states().len(), 1);
        assert_eq!(polls.polls[1].group, None);
        assert_eq!(polls.polls[2].error.as_deref(), Some("Throttling: Rate exceeded"));
    }
}
