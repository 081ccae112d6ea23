use std::sync::atomic::Ordering;
use std::sync::Arc;

use dwork_rpc::{Handler, HandlerError, Reply, Request, RequestKind, Status};
use tracing::{debug, info, trace};

use crate::capacity::{CapacityCache, Delta};
use crate::executor::WorkExecutor;
use crate::listener::{notify_delta, NotificationListener};
use crate::registry::PeerRegistry;
use crate::statistics::TransportStatistics;

/// Handles the commands peers send to this node.
///
/// Membership commands mutate the registry, work commands are handed to the
/// local executor and capacity notifications only ever touch the cache.
pub struct DispatchService {
    node_id: Arc<str>,
    registry: PeerRegistry,
    capacity: CapacityCache,
    executor: Arc<dyn WorkExecutor>,
    listeners: Arc<[Arc<dyn NotificationListener>]>,
    statistics: TransportStatistics,
}

impl DispatchService {
    pub(crate) fn new(
        node_id: Arc<str>,
        registry: PeerRegistry,
        capacity: CapacityCache,
        executor: Arc<dyn WorkExecutor>,
        listeners: Arc<[Arc<dyn NotificationListener>]>,
        statistics: TransportStatistics,
    ) -> Self {
        Self {
            node_id,
            registry,
            capacity,
            executor,
            listeners,
            statistics,
        }
    }

    fn on_join(&self, request: &Request) -> Result<Reply, HandlerError> {
        let peer_id = request.str_arg(0)?;
        let address = request.str_arg(1)?;

        info!(
            self_node_id = %self.node_id,
            target_node_id = %peer_id,
            target_addr = %address,
            "Node has joined the cluster."
        );

        self.registry.put(peer_id, address);
        self.capacity.insert_peer(peer_id);
        for listener in self.listeners.iter() {
            listener.join(peer_id);
        }

        Ok(Reply::Void)
    }

    fn on_leave(&self, request: &Request) -> Result<Reply, HandlerError> {
        let peer_id = request.str_arg(0)?;

        info!(
            self_node_id = %self.node_id,
            target_node_id = %peer_id,
            "Node is no longer part of cluster."
        );

        self.registry.remove(peer_id);
        self.capacity.remove_peer(peer_id);
        for listener in self.listeners.iter() {
            listener.leave(peer_id);
        }

        Ok(Reply::Void)
    }

    fn on_update(&self, request: &Request) -> Result<Reply, HandlerError> {
        let peer_id = request.str_arg(0)?;
        let count = request.long_arg(1)?;
        let count = u64::try_from(count).map_err(|_| {
            Status::invalid(format!(
                "{} expected a non-negative count but got {count}.",
                request.kind()
            ))
        })?;

        let cached = if request.kind() == RequestKind::UpdateShortRunningFree {
            for listener in self.listeners.iter() {
                listener.update_short_running_free(peer_id, count);
            }
            self.capacity.set_short_running_free(peer_id, count)
        } else {
            for listener in self.listeners.iter() {
                listener.update_long_running_free(peer_id, count);
            }
            self.capacity.set_long_running_free(peer_id, count)
        };
        if !cached {
            self.log_unknown_peer(request.kind(), peer_id);
        }

        Ok(Reply::Void)
    }

    fn on_delta(&self, request: &Request, delta: Delta) -> Result<Reply, HandlerError> {
        let peer_id = request.str_arg(0)?;

        if !self.capacity.record_delta(peer_id, delta) {
            self.log_unknown_peer(request.kind(), peer_id);
        }
        for listener in self.listeners.iter() {
            notify_delta(listener.as_ref(), peer_id, delta);
        }

        Ok(Reply::Void)
    }

    fn log_unknown_peer(&self, kind: RequestKind, peer_id: &str) {
        debug!(
            self_node_id = %self.node_id,
            target_node_id = %peer_id,
            command = %kind,
            "Ignoring capacity notification from a peer which is not part of the cluster."
        );
    }
}

#[dwork_rpc::async_trait]
impl Handler for DispatchService {
    async fn on_request(&self, mut request: Request) -> Result<Reply, HandlerError> {
        self.statistics
            .num_requests_handled
            .fetch_add(1, Ordering::Relaxed);

        trace!(
            self_node_id = %self.node_id,
            command = %request.kind(),
            remote_addr = %request.remote_addr(),
            "Handling command."
        );

        match request.kind() {
            RequestKind::Join => self.on_join(&request),
            RequestKind::Leave => self.on_leave(&request),
            RequestKind::Ping => Ok(Reply::Void),
            RequestKind::DoWork => {
                let work = request.take_work(0)?;
                self.executor.local_do_work(work).await?;
                Ok(Reply::Void)
            },
            RequestKind::StartWork => {
                let work = request.take_work(0)?;
                let elapsed = self.executor.local_start_work(work).await?;
                Ok(Reply::Long(to_long(elapsed)))
            },
            RequestKind::ScheduleWork => {
                let work = request.take_work(0)?;
                self.executor.local_schedule_work(work).await?;
                Ok(Reply::Void)
            },
            RequestKind::GetShortRunningFree => {
                Ok(Reply::Long(to_long(self.executor.local_short_running_free())))
            },
            RequestKind::GetLongRunningFree => {
                Ok(Reply::Long(to_long(self.executor.local_long_running_free())))
            },
            RequestKind::UpdateShortRunningFree | RequestKind::UpdateLongRunningFree => {
                self.on_update(&request)
            },
            RequestKind::DeltaDoWorkAccepted => {
                self.on_delta(&request, Delta::DoWorkAccepted)
            },
            RequestKind::DeltaDoWorkRejected => {
                self.on_delta(&request, Delta::DoWorkRejected)
            },
            RequestKind::DeltaStartWorkAccepted => {
                self.on_delta(&request, Delta::StartWorkAccepted)
            },
            RequestKind::DeltaStartWorkRejected => {
                self.on_delta(&request, Delta::StartWorkRejected)
            },
            RequestKind::DeltaScheduleWorkAccepted => {
                self.on_delta(&request, Delta::ScheduleWorkAccepted)
            },
            RequestKind::DeltaScheduleWorkRejected => {
                self.on_delta(&request, Delta::ScheduleWorkRejected)
            },
            RequestKind::DeltaWorkSuccessful => {
                self.on_delta(&request, Delta::WorkSuccessful)
            },
            RequestKind::DeltaWorkFailed => self.on_delta(&request, Delta::WorkFailed),
        }
    }
}

#[inline]
fn to_long(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use dwork_rpc::{async_trait, ErrorCode, Value, WorkError, WorkErrorKind, WorkUnit};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingExecutor {
        received: Mutex<Vec<WorkUnit>>,
        short_running_free: AtomicU64,
    }

    #[async_trait]
    impl WorkExecutor for RecordingExecutor {
        async fn local_do_work(&self, work: WorkUnit) -> Result<(), WorkError> {
            self.received.lock().push(work);
            Ok(())
        }

        async fn local_start_work(&self, _work: WorkUnit) -> Result<u64, WorkError> {
            Ok(12)
        }

        async fn local_schedule_work(&self, _work: WorkUnit) -> Result<(), WorkError> {
            Err(WorkError::rejected("Pool is full."))
        }

        fn local_short_running_free(&self) -> u64 {
            self.short_running_free.load(Ordering::Relaxed)
        }

        fn local_long_running_free(&self) -> u64 {
            0
        }
    }

    #[derive(Default)]
    struct CountingListener {
        joined: AtomicU64,
        failed: AtomicU64,
    }

    impl NotificationListener for CountingListener {
        fn join(&self, _peer_id: &str) {
            self.joined.fetch_add(1, Ordering::Relaxed);
        }

        fn delta_work_failed(&self, _peer_id: &str) {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct Setup {
        service: DispatchService,
        registry: PeerRegistry,
        capacity: CapacityCache,
        executor: Arc<RecordingExecutor>,
        listener: Arc<CountingListener>,
    }

    fn setup() -> Setup {
        let registry = PeerRegistry::default();
        let capacity = CapacityCache::default();
        let executor = Arc::new(RecordingExecutor::default());
        let listener = Arc::new(CountingListener::default());
        let listeners: Vec<Arc<dyn NotificationListener>> =
            vec![listener.clone() as Arc<dyn NotificationListener>];
        let service = DispatchService::new(
            Arc::from("node-1"),
            registry.clone(),
            capacity.clone(),
            executor.clone(),
            Arc::from(listeners),
            TransportStatistics::default(),
        );

        Setup {
            service,
            registry,
            capacity,
            executor,
            listener,
        }
    }

    #[tokio::test]
    async fn test_join_and_leave() {
        let setup = setup();

        let join = Request::using_owned(
            RequestKind::Join,
            vec![Value::from("node-2"), Value::from("127.0.0.1:9002")],
        );
        let reply = setup.service.on_request(join).await.expect("Join peer");
        assert_eq!(reply, Reply::Void);
        assert_eq!(setup.registry.lookup("node-2").unwrap(), "127.0.0.1:9002");
        assert!(setup.capacity.get("node-2").is_some());
        assert_eq!(setup.listener.joined.load(Ordering::Relaxed), 1);

        for _ in 0..2 {
            let leave = Request::using_owned(RequestKind::Leave, vec![Value::from("node-2")]);
            let reply = setup.service.on_request(leave).await.expect("Leave peer");
            assert_eq!(reply, Reply::Void);
        }
        assert!(!setup.registry.contains("node-2"));
        assert!(setup.capacity.get("node-2").is_none());
    }

    #[tokio::test]
    async fn test_work_dispatch() {
        let setup = setup();
        let work = WorkUnit::new(b"payload".to_vec());

        let req = Request::using_owned(RequestKind::DoWork, vec![Value::Work(work.clone())]);
        setup.service.on_request(req).await.expect("Do work");
        assert_eq!(setup.executor.received.lock().as_slice(), &[work.clone()]);

        let req = Request::using_owned(RequestKind::StartWork, vec![Value::Work(work.clone())]);
        let reply = setup.service.on_request(req).await.expect("Start work");
        assert_eq!(reply, Reply::Long(12));

        let req = Request::using_owned(RequestKind::ScheduleWork, vec![Value::Work(work)]);
        let err = setup.service.on_request(req).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Work(WorkError {
                kind: WorkErrorKind::Rejected,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_capacity_queries() {
        let setup = setup();
        setup.executor.short_running_free.store(7, Ordering::Relaxed);

        let req = Request::using_owned(RequestKind::GetShortRunningFree, vec![]);
        let reply = setup.service.on_request(req).await.expect("Get free");
        assert_eq!(reply, Reply::Long(7));

        let req = Request::using_owned(RequestKind::GetLongRunningFree, vec![]);
        let reply = setup.service.on_request(req).await.expect("Get free");
        assert_eq!(reply, Reply::Long(0));
    }

    #[tokio::test]
    async fn test_updates_only_touch_cache() {
        let setup = setup();
        setup.executor.short_running_free.store(7, Ordering::Relaxed);

        let join = Request::using_owned(
            RequestKind::Join,
            vec![Value::from("node-3"), Value::from("127.0.0.1:9003")],
        );
        setup.service.on_request(join).await.expect("Join peer");

        let req = Request::using_owned(
            RequestKind::UpdateShortRunningFree,
            vec![Value::from("node-3"), Value::Long(2)],
        );
        setup.service.on_request(req).await.expect("Update free");

        let req = Request::using_owned(RequestKind::DeltaWorkFailed, vec![Value::from("node-3")]);
        setup.service.on_request(req).await.expect("Delta");

        let entry = setup.capacity.get("node-3").unwrap();
        assert_eq!(entry.short_running_free, Some(2));
        assert_eq!(entry.deltas.work_failed, 1);
        assert_eq!(setup.listener.failed.load(Ordering::Relaxed), 1);
        assert_eq!(setup.executor.local_short_running_free(), 7);
    }

    #[tokio::test]
    async fn test_updates_after_leave_not_cached() {
        let setup = setup();

        let join = Request::using_owned(
            RequestKind::Join,
            vec![Value::from("node-3"), Value::from("127.0.0.1:9003")],
        );
        setup.service.on_request(join).await.expect("Join peer");
        let leave = Request::using_owned(RequestKind::Leave, vec![Value::from("node-3")]);
        setup.service.on_request(leave).await.expect("Leave peer");

        let req = Request::using_owned(RequestKind::DeltaWorkFailed, vec![Value::from("node-3")]);
        let reply = setup.service.on_request(req).await.expect("Delta");
        assert_eq!(reply, Reply::Void);

        let req = Request::using_owned(
            RequestKind::UpdateLongRunningFree,
            vec![Value::from("node-3"), Value::Long(5)],
        );
        setup.service.on_request(req).await.expect("Update free");

        assert!(setup.capacity.is_empty());
        assert_eq!(setup.capacity.totals().work_failed, 0);
        assert_eq!(setup.listener.failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let setup = setup();

        let req = Request::using_owned(
            RequestKind::UpdateLongRunningFree,
            vec![Value::from("node-3"), Value::Long(-4)],
        );
        let err = setup.service.on_request(req).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Generic(Status {
                code: ErrorCode::InvalidPayload,
                ..
            })
        ));

        let req = Request::using_owned(RequestKind::DoWork, vec![Value::from("not work")]);
        let err = setup.service.on_request(req).await.unwrap_err();
        assert!(matches!(err, HandlerError::Generic(_)));
        assert!(setup.executor.received.lock().is_empty());
    }
}
