use crate::state::AppState;
use portal_core::dto::{ChatMessage, LiveReport};
use portal_core::navigation::{LiveFeed, NavigationNode};
use portal_core::polling::{MountGuard, Snapshot, Subscription};
use portal_core::router::{NavigationOutcome, PublicView, RoleRouter, Route};
use portal_core::{PortalError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub trait EventSink: Send + Sync + 'static {
    fn emit_json(&self, event: &str, payload: serde_json::Value);
}

/// Prints one JSON line per event.
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit_json(&self, event: &str, payload: serde_json::Value) {
        println!("{}", serde_json::json!({ "event": event, "payload": payload }));
    }
}

#[derive(Debug, Serialize)]
struct NavEntry {
    path: String,
    title: &'static str,
    depth: usize,
}

enum LiveSubscription {
    Chat(Subscription<Vec<ChatMessage>>),
    Report(Subscription<LiveReport>),
}

struct MountedView {
    feed: LiveFeed,
    _subscription: LiveSubscription,
    guard: MountGuard,
    forwarder: JoinHandle<()>,
}

impl Drop for MountedView {
    fn drop(&mut self) {
        self.guard.unmount();
        self.forwarder.abort();
    }
}

/// Headless stand-in for the browser shell: owns the router, mounts the
/// view for the current route and tears down its polling on every change.
pub struct Shell {
    state: AppState,
    router: RoleRouter,
    sink: Arc<dyn EventSink>,
    mounted: Option<MountedView>,
}

impl Shell {
    pub fn new(state: AppState, sink: impl EventSink) -> Self {
        let router = RoleRouter::new(state.auth.sessions().clone());
        Self {
            state,
            router,
            sink: Arc::new(sink),
            mounted: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn current(&self) -> &Route {
        self.router.current()
    }

    pub fn mounted_feed(&self) -> Option<LiveFeed> {
        self.mounted.as_ref().map(|m| m.feed)
    }

    /// Fresh load: resume a persisted session if there is one.
    pub fn start(&mut self) -> Result<Route> {
        let route = self.router.dispatch()?;
        self.mount(&route);
        Ok(route)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<Route> {
        self.state.auth.login(email, password).await?;
        let route = self.router.dispatch()?;
        self.emit_navigation(&route);
        self.mount(&route);
        Ok(route)
    }

    pub fn open(&mut self, path: &str) -> Result<NavigationOutcome> {
        let outcome = self.router.navigate(path)?;
        if let NavigationOutcome::Denied { requested, .. } = &outcome {
            self.sink
                .emit_json("navigation-denied", serde_json::json!({ "path": requested }));
        }
        let route = outcome.route().clone();
        self.mount(&route);
        Ok(outcome)
    }

    pub fn logout(&mut self) -> Result<Route> {
        self.unmount();
        self.state.auth.logout()?;
        self.router.reset();
        let route = self.router.current().clone();
        self.emit_route(&route);
        Ok(route)
    }

    /// Follow up on a session cleared elsewhere (expiry or a 401 seen by a
    /// poll loop) by leaving the protected view for the login view.
    pub fn sync_session(&mut self) -> Result<()> {
        if !matches!(self.router.current(), Route::Dashboard { .. }) {
            return Ok(());
        }
        if self.state.auth.sessions().current()?.is_none() {
            info!("session ended, returning to login");
            self.open(portal_core::router::LOGIN_PATH)?;
        }
        Ok(())
    }

    fn mount(&mut self, route: &Route) {
        self.unmount();
        self.emit_route(route);

        let Some(feed) = route.view().and_then(|v| v.live_feed()) else {
            return;
        };
        let sink = Arc::clone(&self.sink);
        let guard = MountGuard::new();
        let mounted = match feed {
            LiveFeed::Chat => {
                let sub = self.state.polling.subscribe::<Vec<ChatMessage>>(feed.endpoint());
                let forwarder = forward(sub.watch(), sink, "chat-updated", guard.clone());
                MountedView {
                    feed,
                    _subscription: LiveSubscription::Chat(sub),
                    guard,
                    forwarder,
                }
            }
            LiveFeed::LiveReport => {
                let sub = self.state.polling.subscribe::<LiveReport>(feed.endpoint());
                let forwarder = forward(sub.watch(), sink, "report-updated", guard.clone());
                MountedView {
                    feed,
                    _subscription: LiveSubscription::Report(sub),
                    guard,
                    forwarder,
                }
            }
        };
        self.mounted = Some(mounted);
    }

    fn unmount(&mut self) {
        if let Some(view) = self.mounted.take() {
            info!(feed = ?view.feed, "unmounting live view");
        }
    }

    fn emit_route(&self, route: &Route) {
        let kind = match route {
            Route::Public(PublicView::Landing) => "landing",
            Route::Public(PublicView::Login) => "login",
            Route::Dashboard { .. } => "dashboard",
        };
        self.sink.emit_json(
            "route-changed",
            serde_json::json!({ "kind": kind, "path": route.path() }),
        );
    }

    fn emit_navigation(&self, route: &Route) {
        let Route::Dashboard { role, .. } = route else {
            return;
        };
        let tree = self.router.tree(*role);
        let mut entries = Vec::new();
        for node in &tree.nodes {
            flatten(node, tree.root_segment(), 0, &mut entries);
        }
        self.sink.emit_json(
            "navigation",
            serde_json::json!({ "role": role.as_str(), "entries": entries }),
        );
    }
}

fn flatten(node: &NavigationNode, prefix: &str, depth: usize, out: &mut Vec<NavEntry>) {
    let path = format!("{prefix}/{}", node.segment);
    out.push(NavEntry {
        path: path.clone(),
        title: node.title,
        depth,
    });
    for child in node.children() {
        flatten(child, &path, depth + 1, out);
    }
}

fn forward<T>(
    mut rx: watch::Receiver<Snapshot<T>>,
    sink: Arc<dyn EventSink>,
    event: &'static str,
    guard: MountGuard,
) -> JoinHandle<()>
where
    T: Serialize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snap = rx.borrow_and_update().clone();
            let Some((name, payload)) = render(&snap, event) else {
                continue;
            };
            if guard
                .while_mounted(|| sink.emit_json(name, payload))
                .is_none()
            {
                return;
            }
        }
    })
}

/// The event a snapshot turns into, if any.
fn render<T: Serialize>(snap: &Snapshot<T>, event: &'static str) -> Option<(&'static str, serde_json::Value)> {
    match (&snap.notice, &snap.payload) {
        (Some(PortalError::Unauthorized | PortalError::NotAuthenticated), _) => {
            Some(("session-expired", serde_json::json!({})))
        }
        (Some(notice), _) => Some(notice_event(&notice.to_string(), snap.failures)),
        (None, Some(payload)) => match serde_json::to_value(&**payload) {
            Ok(value) => Some((event, value)),
            Err(err) => {
                warn!(event, error = %err, "payload not serializable");
                Some(notice_event(&err.to_string(), snap.failures))
            }
        },
        (None, None) => None,
    }
}

fn notice_event(message: &str, failures: u64) -> (&'static str, serde_json::Value) {
    (
        "notice",
        serde_json::json!({ "message": message, "failures": failures }),
    )
}
