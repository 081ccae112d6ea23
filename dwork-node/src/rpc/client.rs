use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use dwork_rpc::{CodecError, Reply, RequestKind, RpcClient, TransportError, Value, WorkUnit};
use futures::future;
use tracing::{debug, trace};

use crate::capacity::Delta;
use crate::executor::WorkExecutor;
use crate::registry::PeerRegistry;
use crate::statistics::TransportStatistics;

/// Returned by [TransportClient::ping] when the peer could not be reached.
pub const PING_UNREACHABLE: u64 = u64::MAX;

#[derive(Clone)]
/// Sends commands to the peers of the node.
///
/// Every command looks up the target peer in the registry and opens a
/// connection of its own. Commands targeting the node itself are served by
/// the local executor without touching the network.
pub struct TransportClient {
    node_id: Arc<str>,
    registry: PeerRegistry,
    executor: Arc<dyn WorkExecutor>,
    rpc: RpcClient,
    statistics: TransportStatistics,
}

impl TransportClient {
    pub(crate) fn new(
        node_id: Arc<str>,
        registry: PeerRegistry,
        executor: Arc<dyn WorkExecutor>,
        rpc: RpcClient,
        statistics: TransportStatistics,
    ) -> Self {
        Self {
            node_id,
            registry,
            executor,
            rpc,
            statistics,
        }
    }

    #[inline]
    /// The id of the node sending commands.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[inline]
    fn is_self(&self, peer_id: &str) -> bool {
        peer_id == self.node_id.as_ref()
    }

    /// Sends a single command to the given peer.
    pub async fn send(
        &self,
        peer_id: &str,
        kind: RequestKind,
        args: &[Value],
    ) -> Result<Reply, TransportError> {
        trace!(peer_id = %peer_id, command = %kind, "Sending command.");

        let address = self.registry.lookup(peer_id)?;

        self.statistics
            .num_requests_sent
            .fetch_add(1, Ordering::Relaxed);
        let result = self.rpc.send(&address, kind, args).await;
        if result.is_err() {
            self.statistics
                .num_send_failures
                .fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    /// Announces this node to the given peer under the given address.
    pub async fn join(&self, peer_id: &str, address: &str) -> Result<(), TransportError> {
        if self.is_self(peer_id) {
            return Ok(());
        }

        let args = [
            Value::from(self.node_id.as_ref()),
            Value::from(address),
        ];
        self.send(peer_id, RequestKind::Join, &args).await?;
        Ok(())
    }

    /// Tells the given peer this node is leaving.
    pub async fn leave(&self, peer_id: &str) -> Result<(), TransportError> {
        if self.is_self(peer_id) {
            return Ok(());
        }

        let args = [Value::from(self.node_id.as_ref())];
        self.send(peer_id, RequestKind::Leave, &args).await?;
        Ok(())
    }

    /// Measures the round trip time to the peer in milliseconds.
    ///
    /// Returns [PING_UNREACHABLE] if the peer could not be reached for any reason.
    pub async fn ping(&self, peer_id: &str) -> u64 {
        if self.is_self(peer_id) {
            return 0;
        }

        let start = Instant::now();
        match self.send(peer_id, RequestKind::Ping, &[]).await {
            Ok(_) => start.elapsed().as_millis() as u64,
            Err(e) => {
                debug!(peer_id = %peer_id, error = ?e, "Peer is unreachable.");
                PING_UNREACHABLE
            },
        }
    }

    /// Runs the work on the given peer and waits for it to complete.
    pub async fn do_work(&self, peer_id: &str, work: &WorkUnit) -> Result<(), TransportError> {
        if self.is_self(peer_id) {
            self.executor.local_do_work(work.clone()).await?;
            return Ok(());
        }

        self.forward_work(peer_id, RequestKind::DoWork, work).await?;
        Ok(())
    }

    /// Starts the work on the given peer.
    ///
    /// Returns the number of milliseconds the remote executor took to start it.
    pub async fn start_work(
        &self,
        peer_id: &str,
        work: &WorkUnit,
    ) -> Result<u64, TransportError> {
        if self.is_self(peer_id) {
            let elapsed = self.executor.local_start_work(work.clone()).await?;
            return Ok(elapsed);
        }

        let reply = self
            .forward_work(peer_id, RequestKind::StartWork, work)
            .await?;
        expect_count(reply)
    }

    /// Schedules the work on the given peer.
    pub async fn schedule_work(
        &self,
        peer_id: &str,
        work: &WorkUnit,
    ) -> Result<(), TransportError> {
        if self.is_self(peer_id) {
            self.executor.local_schedule_work(work.clone()).await?;
            return Ok(());
        }

        self.forward_work(peer_id, RequestKind::ScheduleWork, work)
            .await?;
        Ok(())
    }

    async fn forward_work(
        &self,
        peer_id: &str,
        kind: RequestKind,
        work: &WorkUnit,
    ) -> Result<Reply, TransportError> {
        let reply = self
            .send(peer_id, kind, &[Value::Work(work.clone())])
            .await?;

        self.statistics
            .num_work_forwarded
            .fetch_add(1, Ordering::Relaxed);
        Ok(reply)
    }

    /// Gets the number of free short-running slots of the given peer.
    pub async fn get_short_running_free(&self, peer_id: &str) -> Result<u64, TransportError> {
        if self.is_self(peer_id) {
            return Ok(self.executor.local_short_running_free());
        }

        let reply = self
            .send(peer_id, RequestKind::GetShortRunningFree, &[])
            .await?;
        expect_count(reply)
    }

    /// Gets the number of free long-running slots of the given peer.
    pub async fn get_long_running_free(&self, peer_id: &str) -> Result<u64, TransportError> {
        if self.is_self(peer_id) {
            return Ok(self.executor.local_long_running_free());
        }

        let reply = self
            .send(peer_id, RequestKind::GetLongRunningFree, &[])
            .await?;
        expect_count(reply)
    }

    /// Pushes this node's short-running free count to the given peer.
    pub async fn update_short_running_free(
        &self,
        peer_id: &str,
        count: u64,
    ) -> Result<(), TransportError> {
        self.push_count(peer_id, RequestKind::UpdateShortRunningFree, count)
            .await
    }

    /// Pushes this node's long-running free count to the given peer.
    pub async fn update_long_running_free(
        &self,
        peer_id: &str,
        count: u64,
    ) -> Result<(), TransportError> {
        self.push_count(peer_id, RequestKind::UpdateLongRunningFree, count)
            .await
    }

    async fn push_count(
        &self,
        peer_id: &str,
        kind: RequestKind,
        count: u64,
    ) -> Result<(), TransportError> {
        if self.is_self(peer_id) {
            return Ok(());
        }

        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let args = [Value::from(self.node_id.as_ref()), Value::Long(count)];
        self.send(peer_id, kind, &args).await?;
        Ok(())
    }

    /// Pushes this node's short-running free count to every known peer.
    pub async fn broadcast_short_running_free(&self, count: u64) {
        self.broadcast_count(RequestKind::UpdateShortRunningFree, count)
            .await
    }

    /// Pushes this node's long-running free count to every known peer.
    pub async fn broadcast_long_running_free(&self, count: u64) {
        self.broadcast_count(RequestKind::UpdateLongRunningFree, count)
            .await
    }

    async fn broadcast_count(&self, kind: RequestKind, count: u64) {
        let peers = self.registry.peers();
        let tasks = peers.iter().map(|(peer_id, _)| async move {
            if let Err(e) = self.push_count(peer_id, kind, count).await {
                debug!(
                    peer_id = %peer_id,
                    command = %kind,
                    error = ?e,
                    "Failed to push free count to peer."
                );
            }
        });

        future::join_all(tasks).await;
    }

    pub async fn delta_do_work_accepted(&self, peer_id: &str) {
        self.notify(peer_id, Delta::DoWorkAccepted).await
    }

    pub async fn delta_do_work_rejected(&self, peer_id: &str) {
        self.notify(peer_id, Delta::DoWorkRejected).await
    }

    pub async fn delta_start_work_accepted(&self, peer_id: &str) {
        self.notify(peer_id, Delta::StartWorkAccepted).await
    }

    pub async fn delta_start_work_rejected(&self, peer_id: &str) {
        self.notify(peer_id, Delta::StartWorkRejected).await
    }

    pub async fn delta_schedule_work_accepted(&self, peer_id: &str) {
        self.notify(peer_id, Delta::ScheduleWorkAccepted).await
    }

    pub async fn delta_schedule_work_rejected(&self, peer_id: &str) {
        self.notify(peer_id, Delta::ScheduleWorkRejected).await
    }

    pub async fn delta_work_successful(&self, peer_id: &str) {
        self.notify(peer_id, Delta::WorkSuccessful).await
    }

    pub async fn delta_work_failed(&self, peer_id: &str) {
        self.notify(peer_id, Delta::WorkFailed).await
    }

    /// Sends a delta notification, failures are logged and otherwise ignored.
    async fn notify(&self, peer_id: &str, delta: Delta) {
        if self.is_self(peer_id) {
            return;
        }

        let kind = delta.request_kind();
        let args = [Value::from(self.node_id.as_ref())];
        if let Err(e) = self.send(peer_id, kind, &args).await {
            debug!(
                peer_id = %peer_id,
                command = %kind,
                error = ?e,
                "Failed to notify peer."
            );
        }
    }
}

/// Reads a non-negative count out of a `LONG_OK` reply.
fn expect_count(reply: Reply) -> Result<u64, TransportError> {
    match reply {
        Reply::Long(value) => u64::try_from(value).map_err(|_| CodecError::Invalid.into()),
        Reply::Void => Err(CodecError::Invalid.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_count() {
        assert_eq!(expect_count(Reply::Long(7)).unwrap(), 7);
        assert!(matches!(
            expect_count(Reply::Long(-1)),
            Err(TransportError::Codec(CodecError::Invalid))
        ));
        assert!(matches!(
            expect_count(Reply::Void),
            Err(TransportError::Codec(CodecError::Invalid))
        ));
    }
}
