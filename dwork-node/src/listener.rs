use crate::capacity::Delta;

#[allow(unused_variables)]
/// Receives membership and capacity notifications sent by peers.
///
/// Listeners are called after the capacity cache has been updated, all methods
/// default to doing nothing so implementors only pick what they need.
pub trait NotificationListener: Send + Sync + 'static {
    /// A peer has joined the cluster.
    fn join(&self, peer_id: &str) {}

    /// A peer has left the cluster.
    fn leave(&self, peer_id: &str) {}

    /// A peer has pushed its short-running free count.
    fn update_short_running_free(&self, peer_id: &str, count: u64) {}

    /// A peer has pushed its long-running free count.
    fn update_long_running_free(&self, peer_id: &str, count: u64) {}

    fn delta_do_work_accepted(&self, peer_id: &str) {}

    fn delta_do_work_rejected(&self, peer_id: &str) {}

    fn delta_start_work_accepted(&self, peer_id: &str) {}

    fn delta_start_work_rejected(&self, peer_id: &str) {}

    fn delta_schedule_work_accepted(&self, peer_id: &str) {}

    fn delta_schedule_work_rejected(&self, peer_id: &str) {}

    fn delta_work_successful(&self, peer_id: &str) {}

    fn delta_work_failed(&self, peer_id: &str) {}
}

/// Calls the listener method matching the delta.
pub(crate) fn notify_delta(listener: &dyn NotificationListener, peer_id: &str, delta: Delta) {
    match delta {
        Delta::DoWorkAccepted => listener.delta_do_work_accepted(peer_id),
        Delta::DoWorkRejected => listener.delta_do_work_rejected(peer_id),
        Delta::StartWorkAccepted => listener.delta_start_work_accepted(peer_id),
        Delta::StartWorkRejected => listener.delta_start_work_rejected(peer_id),
        Delta::ScheduleWorkAccepted => listener.delta_schedule_work_accepted(peer_id),
        Delta::ScheduleWorkRejected => listener.delta_schedule_work_rejected(peer_id),
        Delta::WorkSuccessful => listener.delta_work_successful(peer_id),
        Delta::WorkFailed => listener.delta_work_failed(peer_id),
    }
}
