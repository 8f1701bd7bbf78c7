//! Fixed-interval polling used by chat and live-report views.
//!
//! A [`Subscription`] owns one spawned loop. The loop fetches immediately,
//! then once per interval, with at most one request in flight; ticks that
//! fall due while a request is pending are skipped, so an older response can
//! never land after a newer one. Every successful response replaces the
//! payload wholesale. A failed fetch keeps the previous payload and sets a
//! transient notice; the next tick simply tries again.
//!
//! Stopping (explicitly or by dropping the handle) clears the subscription's
//! [`MountGuard`] and then aborts the task. Every write to the snapshot is
//! made under that guard's lock, so a tick that is mid-poll on another
//! worker when `stop()` runs finds the guard cleared and writes nothing.

use crate::error::PortalError;
use crate::session::SessionStore;
use crate::transport::{decode, Transport};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Latest state of a polled resource as seen by its view.
pub struct Snapshot<T> {
    pub payload: Option<Arc<T>>,
    /// Error from the most recent failed tick, cleared by the next success.
    pub notice: Option<PortalError>,
    pub fetches: u64,
    pub failures: u64,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            payload: None,
            notice: None,
            fetches: 0,
            failures: 0,
        }
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            payload: self.payload.clone(),
            notice: self.notice.clone(),
            fetches: self.fetches,
            failures: self.failures,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("payload", &self.payload)
            .field("notice", &self.notice)
            .field("fetches", &self.fetches)
            .field("failures", &self.failures)
            .finish()
    }
}

/// Mounted flag shared by a view and the tasks writing into it. Writers
/// hold the lock across the write, so once [`MountGuard::unmount`] returns
/// no further write can land.
#[derive(Clone, Debug)]
pub struct MountGuard(Arc<Mutex<bool>>);

impl MountGuard {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn unmount(&self) {
        *self.lock() = false;
    }

    pub fn is_mounted(&self) -> bool {
        *self.lock()
    }

    /// Run `write` only if still mounted. Returns `None` after unmount.
    pub fn while_mounted<R>(&self, write: impl FnOnce() -> R) -> Option<R> {
        let mounted = self.lock();
        if *mounted {
            Some(write())
        } else {
            None
        }
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct PollingClient {
    transport: Arc<dyn Transport>,
    sessions: SessionStore,
    interval: Duration,
}

impl PollingClient {
    pub fn new(transport: Arc<dyn Transport>, sessions: SessionStore, interval: Duration) -> Self {
        Self {
            transport,
            sessions,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `endpoint` at the client's default interval. Must be
    /// called from within a tokio runtime.
    pub fn subscribe<T>(&self, endpoint: &str) -> Subscription<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.subscribe_every(endpoint, self.interval)
    }

    /// A zero `interval` falls back to [`DEFAULT_POLL_INTERVAL`].
    pub fn subscribe_every<T>(&self, endpoint: &str, interval: Duration) -> Subscription<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let interval = if interval.is_zero() {
            warn!(endpoint, "zero poll interval, using default");
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        let (tx, rx) = watch::channel(Snapshot::default());
        let guard = MountGuard::new();
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.transport),
            self.sessions.clone(),
            endpoint.to_string(),
            interval,
            Publisher {
                tx,
                guard: guard.clone(),
            },
        ));
        debug!(endpoint, interval_ms = interval.as_millis() as u64, "subscribed");

        Subscription {
            endpoint: endpoint.to_string(),
            interval,
            rx,
            guard,
            task: Some(task),
        }
    }
}

/// Handle to a running poll loop; dropping it unmounts the resource.
pub struct Subscription<T> {
    endpoint: String,
    interval: Duration,
    rx: watch::Receiver<Snapshot<T>>,
    guard: MountGuard,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn latest(&self) -> Snapshot<T> {
        self.rx.borrow().clone()
    }

    /// A receiver for forwarding updates elsewhere. It reports closed once
    /// the loop ends.
    pub fn watch(&self) -> watch::Receiver<Snapshot<T>> {
        self.rx.clone()
    }

    /// Wait for the next update. Returns `false` once the loop has ended.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn stop(&mut self) {
        self.guard.unmount();
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(endpoint = %self.endpoint, "unsubscribed");
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Snapshot sender that only writes while its subscription is mounted.
struct Publisher<T> {
    tx: watch::Sender<Snapshot<T>>,
    guard: MountGuard,
}

impl<T> Publisher<T> {
    /// Returns `false` once the subscription has been stopped.
    fn publish(&self, update: impl FnOnce(&mut Snapshot<T>)) -> bool {
        self.guard
            .while_mounted(|| self.tx.send_modify(update))
            .is_some()
    }

    fn failure(&self, err: PortalError) -> bool {
        self.publish(|snap| {
            snap.notice = Some(err);
            snap.fetches += 1;
            snap.failures += 1;
        })
    }
}

async fn poll_loop<T>(
    transport: Arc<dyn Transport>,
    sessions: SessionStore,
    endpoint: String,
    interval: Duration,
    publisher: Publisher<T>,
) where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let token = match sessions.current() {
            Ok(Some(session)) => session.token,
            Ok(None) => {
                info!(endpoint = %endpoint, "no session, polling stopped");
                publisher.publish(|snap| snap.notice = Some(PortalError::NotAuthenticated));
                return;
            }
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "session read failed");
                if !publisher.failure(err) {
                    return;
                }
                continue;
            }
        };

        let result = transport
            .get_json(&endpoint, Some(&token))
            .await
            .and_then(decode::<T>);

        let mounted = match result {
            Ok(payload) => {
                debug!(endpoint = %endpoint, "poll ok");
                publisher.publish(|snap| {
                    snap.payload = Some(Arc::new(payload));
                    snap.notice = None;
                    snap.fetches += 1;
                })
            }
            Err(PortalError::Unauthorized) => {
                warn!(endpoint = %endpoint, "poll unauthorized, clearing session");
                if let Err(err) = sessions.clear() {
                    warn!(error = %err, "failed to clear session");
                }
                publisher.failure(PortalError::Unauthorized);
                return;
            }
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "poll failed, keeping previous payload");
                publisher.failure(err)
            }
        };
        if !mounted {
            debug!(endpoint = %endpoint, "response arrived after stop, discarded");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;
    use crate::session::Session;
    use crate::storage::MemoryStorage;
    use crate::testing::ScriptedTransport;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_millis(1000);

    fn logged_in(transport: ScriptedTransport) -> (PollingClient, Arc<ScriptedTransport>, SessionStore) {
        let sessions = SessionStore::new(MemoryStorage::new());
        sessions
            .save(&Session::new("tok-poll", Role::Coordinator))
            .expect("save");
        let transport = Arc::new(transport);
        let client = PollingClient::new(transport.clone(), sessions.clone(), TICK);
        (client, transport, sessions)
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_interval() {
        let (client, transport, _) =
            logged_in(ScriptedTransport::new(vec![]).with_fallback(Ok(serde_json::json!([1]))));
        let sub = client.subscribe::<Vec<u32>>("/chat/messages");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transport.calls(), 1);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(transport.calls(), 4);
        assert_eq!(sub.latest().fetches, 4);
        assert!(transport
            .bearers()
            .iter()
            .all(|b| b.as_deref() == Some("tok-poll")));
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_last_successful_payload() {
        let (client, transport, _) = logged_in(ScriptedTransport::new(vec![
            Ok(serde_json::json!([1])),
            Err(PortalError::Transport("connection reset".into())),
            Ok(serde_json::json!([2])),
            Err(PortalError::Status(500)),
        ]));
        let sub = client.subscribe::<Vec<u32>>("/reports/live");

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(transport.calls(), 4);

        let snap = sub.latest();
        assert_eq!(snap.payload.as_deref(), Some(&vec![2]));
        assert_eq!(snap.failures, 2);
        assert_eq!(snap.notice, Some(PortalError::Status(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_notice() {
        let (client, _, _) = logged_in(ScriptedTransport::new(vec![
            Err(PortalError::Status(503)),
            Ok(serde_json::json!([7])),
        ]));
        let sub = client.subscribe::<Vec<u32>>("/chat/messages");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sub.latest().notice.is_some());
        assert!(sub.latest().payload.is_none());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let snap = sub.latest();
        assert!(snap.notice.is_none());
        assert_eq!(snap.payload.as_deref(), Some(&vec![7]));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_timer() {
        let (client, transport, _) =
            logged_in(ScriptedTransport::new(vec![]).with_fallback(Ok(serde_json::json!([]))));
        let mut sub = client.subscribe::<Vec<u32>>("/chat/messages");

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(transport.calls(), 3);

        sub.stop();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(transport.calls(), 3);
        assert!(!sub.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_timer() {
        let (client, transport, _) =
            logged_in(ScriptedTransport::new(vec![]).with_fallback(Ok(serde_json::json!([]))));
        let sub = client.subscribe::<Vec<u32>>("/chat/messages");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(sub);
        let before = transport.calls();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(transport.calls(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_response_is_discarded_after_stop() {
        let (client, transport, _) = logged_in(
            ScriptedTransport::new(vec![Ok(serde_json::json!([9]))]).with_delay(Duration::from_millis(5000)),
        );
        let mut sub = client.subscribe::<Vec<u32>>("/chat/messages");
        let watcher = sub.watch();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(transport.calls(), 1);
        sub.stop();

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert!(watcher.borrow().payload.is_none());
        assert_eq!(watcher.borrow().fetches, 0);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_responses_never_overlap() {
        let (client, transport, _) = logged_in(
            ScriptedTransport::new(vec![
                Ok(serde_json::json!([1])),
                Ok(serde_json::json!([2])),
                Ok(serde_json::json!([3])),
            ])
            .with_fallback(Ok(serde_json::json!([4])))
            .with_delay(Duration::from_millis(2500)),
        );
        let sub = client.subscribe::<Vec<u32>>("/reports/live");

        tokio::time::sleep(Duration::from_millis(9000)).await;
        assert_eq!(transport.max_in_flight(), 1);

        let snap = sub.latest();
        assert_eq!(snap.fetches, 3);
        assert_eq!(snap.payload.as_deref(), Some(&vec![3]));
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_clears_session_and_ends_loop() {
        let (client, transport, sessions) =
            logged_in(ScriptedTransport::new(vec![Err(PortalError::Unauthorized)]));
        let sub = client.subscribe::<Vec<u32>>("/chat/messages");

        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert_eq!(transport.calls(), 1);
        assert_eq!(sessions.load().expect("load"), None);
        assert_eq!(sub.latest().notice, Some(PortalError::Unauthorized));
        assert!(!sub.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_session_stops_without_fetching() {
        let sessions = SessionStore::new(MemoryStorage::new());
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = PollingClient::new(transport.clone(), sessions, TICK);
        let mut sub = client.subscribe::<Vec<u32>>("/chat/messages");

        while sub.changed().await {}
        assert_eq!(transport.calls(), 0);
        assert_eq!(sub.latest().notice, Some(PortalError::NotAuthenticated));
    }

    /// Holds the worker thread inside `poll`, like decoding a large body.
    struct BusyTransport {
        hold: Duration,
        calls: AtomicUsize,
    }

    impl Transport for BusyTransport {
        fn get_json<'a>(
            &'a self,
            _endpoint: &'a str,
            _bearer: Option<&'a str>,
        ) -> BoxFuture<'a, crate::Result<serde_json::Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hold = self.hold;
            async move {
                std::thread::sleep(hold);
                Ok(serde_json::json!([1]))
            }
            .boxed()
        }

        fn post_json<'a>(
            &'a self,
            _endpoint: &'a str,
            _bearer: Option<&'a str>,
            _body: serde_json::Value,
        ) -> BoxFuture<'a, crate::Result<serde_json::Value>> {
            async { Ok(serde_json::Value::Null) }.boxed()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_during_busy_poll_writes_nothing() {
        let sessions = SessionStore::new(MemoryStorage::new());
        sessions
            .save(&Session::new("tok-poll", Role::Donor))
            .expect("save");
        let transport = Arc::new(BusyTransport {
            hold: Duration::from_millis(300),
            calls: AtomicUsize::new(0),
        });
        let client = PollingClient::new(transport.clone(), sessions, TICK);
        let mut sub = client.subscribe::<Vec<u32>>("/chat/messages");
        let watcher = sub.watch();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        sub.stop();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let snap = watcher.borrow().clone();
        assert_eq!(snap.fetches, 0);
        assert!(snap.payload.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_uses_default() {
        let (client, transport, _) =
            logged_in(ScriptedTransport::new(vec![]).with_fallback(Ok(serde_json::json!([]))));
        let sub = client.subscribe_every::<Vec<u32>>("/chat/messages", Duration::ZERO);
        assert_eq!(sub.interval(), DEFAULT_POLL_INTERVAL);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(transport.calls(), 2);
        assert!(sub.is_active());
    }

    #[test]
    fn guard_skips_writes_after_unmount() {
        let guard = MountGuard::new();
        assert_eq!(guard.while_mounted(|| 1), Some(1));

        guard.clone().unmount();
        assert!(!guard.is_mounted());
        assert_eq!(guard.while_mounted(|| 2), None);
    }
}
