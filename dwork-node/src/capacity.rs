use std::collections::HashMap;
use std::sync::Arc;

use dwork_rpc::RequestKind;
use parking_lot::RwLock;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// A single capacity change notified by a peer.
pub enum Delta {
    DoWorkAccepted,
    DoWorkRejected,
    StartWorkAccepted,
    StartWorkRejected,
    ScheduleWorkAccepted,
    ScheduleWorkRejected,
    WorkSuccessful,
    WorkFailed,
}

impl Delta {
    /// Every delta, in the order of their commands.
    pub const ALL: [Delta; 8] = [
        Delta::DoWorkAccepted,
        Delta::DoWorkRejected,
        Delta::StartWorkAccepted,
        Delta::StartWorkRejected,
        Delta::ScheduleWorkAccepted,
        Delta::ScheduleWorkRejected,
        Delta::WorkSuccessful,
        Delta::WorkFailed,
    ];

    /// The command used to notify peers of the delta.
    pub fn request_kind(self) -> RequestKind {
        match self {
            Self::DoWorkAccepted => RequestKind::DeltaDoWorkAccepted,
            Self::DoWorkRejected => RequestKind::DeltaDoWorkRejected,
            Self::StartWorkAccepted => RequestKind::DeltaStartWorkAccepted,
            Self::StartWorkRejected => RequestKind::DeltaStartWorkRejected,
            Self::ScheduleWorkAccepted => RequestKind::DeltaScheduleWorkAccepted,
            Self::ScheduleWorkRejected => RequestKind::DeltaScheduleWorkRejected,
            Self::WorkSuccessful => RequestKind::DeltaWorkSuccessful,
            Self::WorkFailed => RequestKind::DeltaWorkFailed,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
/// The number of each delta notification received.
pub struct DeltaCounts {
    pub do_work_accepted: u64,
    pub do_work_rejected: u64,
    pub start_work_accepted: u64,
    pub start_work_rejected: u64,
    pub schedule_work_accepted: u64,
    pub schedule_work_rejected: u64,
    pub work_successful: u64,
    pub work_failed: u64,
}

impl DeltaCounts {
    /// Gets the count of the given delta.
    pub fn get(&self, delta: Delta) -> u64 {
        match delta {
            Delta::DoWorkAccepted => self.do_work_accepted,
            Delta::DoWorkRejected => self.do_work_rejected,
            Delta::StartWorkAccepted => self.start_work_accepted,
            Delta::StartWorkRejected => self.start_work_rejected,
            Delta::ScheduleWorkAccepted => self.schedule_work_accepted,
            Delta::ScheduleWorkRejected => self.schedule_work_rejected,
            Delta::WorkSuccessful => self.work_successful,
            Delta::WorkFailed => self.work_failed,
        }
    }

    fn counter_mut(&mut self, delta: Delta) -> &mut u64 {
        match delta {
            Delta::DoWorkAccepted => &mut self.do_work_accepted,
            Delta::DoWorkRejected => &mut self.do_work_rejected,
            Delta::StartWorkAccepted => &mut self.start_work_accepted,
            Delta::StartWorkRejected => &mut self.start_work_rejected,
            Delta::ScheduleWorkAccepted => &mut self.schedule_work_accepted,
            Delta::ScheduleWorkRejected => &mut self.schedule_work_rejected,
            Delta::WorkSuccessful => &mut self.work_successful,
            Delta::WorkFailed => &mut self.work_failed,
        }
    }

    fn record(&mut self, delta: Delta) {
        let counter = self.counter_mut(delta);
        *counter = counter.saturating_add(1);
    }

    fn merge(&mut self, other: &DeltaCounts) {
        for delta in Delta::ALL {
            let counter = self.counter_mut(delta);
            *counter = counter.saturating_add(other.get(delta));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// The last known capacity of a single peer.
pub struct PeerCapacity {
    /// The last short-running free count pushed by the peer.
    pub short_running_free: Option<u64>,
    /// The last long-running free count pushed by the peer.
    pub long_running_free: Option<u64>,
    /// The deltas the peer has notified since it joined.
    pub deltas: DeltaCounts,
}

#[derive(Debug, Clone, Default)]
/// An approximate view of the remaining capacity of each peer.
///
/// Entries are created when a peer joins and dropped when it leaves, in
/// between they are only ever updated from notifications sent by the peers
/// themselves. No ordering is guaranteed between pushes and deltas.
pub struct CapacityCache {
    entries: Arc<RwLock<HashMap<String, PeerCapacity>>>,
}

impl CapacityCache {
    /// Creates an empty entry for the peer if it does not already have one.
    pub(crate) fn insert_peer(&self, peer_id: &str) {
        let mut guard = self.entries.write();
        guard.entry(peer_id.to_string()).or_default();
    }

    /// Drops the cached capacity of the peer.
    pub(crate) fn remove_peer(&self, peer_id: &str) {
        self.entries.write().remove(peer_id);
    }

    pub(crate) fn set_short_running_free(&self, peer_id: &str, count: u64) -> bool {
        self.update(peer_id, |entry| entry.short_running_free = Some(count))
    }

    pub(crate) fn set_long_running_free(&self, peer_id: &str, count: u64) -> bool {
        self.update(peer_id, |entry| entry.long_running_free = Some(count))
    }

    pub(crate) fn record_delta(&self, peer_id: &str, delta: Delta) -> bool {
        self.update(peer_id, |entry| entry.deltas.record(delta))
    }

    /// Applies the update to the peer's entry.
    ///
    /// Peers without an entry have either never joined or already left, their
    /// updates are dropped and `false` is returned.
    fn update(&self, peer_id: &str, cb: impl FnOnce(&mut PeerCapacity)) -> bool {
        let mut guard = self.entries.write();
        match guard.get_mut(peer_id) {
            Some(entry) => {
                cb(entry);
                true
            },
            None => false,
        }
    }

    /// Gets the cached capacity of the given peer.
    pub fn get(&self, peer_id: &str) -> Option<PeerCapacity> {
        self.entries.read().get(peer_id).cloned()
    }

    /// A copy of every cached entry.
    pub fn snapshot(&self) -> HashMap<String, PeerCapacity> {
        self.entries.read().clone()
    }

    /// The sum of all deltas across every cached peer.
    pub fn totals(&self) -> DeltaCounts {
        let guard = self.entries.read();
        let mut totals = DeltaCounts::default();
        for entry in guard.values() {
            totals.merge(&entry.deltas);
        }
        totals
    }

    /// The number of peers with a cached entry.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
