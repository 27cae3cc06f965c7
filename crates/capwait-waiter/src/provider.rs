//! Collaborator seams.
//!
//! The waiter never talks to a cloud API directly. Resource handlers
//! supply these two read-only capabilities; transport-level retries, if
//! any, are the provider's business.

use std::future::Future;
use std::sync::Arc;

use capwait_core::{AttachmentStates, AttachmentTarget, Group};

/// Fetches the current snapshot of a group.
pub trait GroupSnapshotProvider {
    /// `Ok(None)` means the group no longer exists.
    fn fetch_group(
        &self,
        group_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Group>>> + Send;
}

/// Fetches each attachment target's view of member health.
pub trait AttachmentStateProvider {
    fn fetch_attachment_states(
        &self,
        targets: &[AttachmentTarget],
    ) -> impl Future<Output = anyhow::Result<AttachmentStates>> + Send;
}

impl<P: GroupSnapshotProvider> GroupSnapshotProvider for &P {
    fn fetch_group(
        &self,
        group_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Group>>> + Send {
        (**self).fetch_group(group_id)
    }
}

impl<P: GroupSnapshotProvider> GroupSnapshotProvider for Arc<P> {
    fn fetch_group(
        &self,
        group_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Group>>> + Send {
        (**self).fetch_group(group_id)
    }
}

impl<P: AttachmentStateProvider> AttachmentStateProvider for &P {
    fn fetch_attachment_states(
        &self,
        targets: &[AttachmentTarget],
    ) -> impl Future<Output = anyhow::Result<AttachmentStates>> + Send {
        (**self).fetch_attachment_states(targets)
    }
}

impl<P: AttachmentStateProvider> AttachmentStateProvider for Arc<P> {
    fn fetch_attachment_states(
        &self,
        targets: &[AttachmentTarget],
    ) -> impl Future<Output = anyhow::Result<AttachmentStates>> + Send {
        (**self).fetch_attachment_states(targets)
    }
}
