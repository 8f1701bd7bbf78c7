use crate::error::Result;
use crate::navigation::{NavigationTree, View};
use crate::role::{Role, RoleClaim};
use crate::session::{Session, SessionStore};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const LOGIN_PATH: &str = "login";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublicView {
    Landing,
    Login,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Public(PublicView),
    Dashboard { role: Role, path: String, view: View },
}

impl Route {
    pub fn path(&self) -> &str {
        match self {
            Route::Public(PublicView::Landing) => "",
            Route::Public(PublicView::Login) => LOGIN_PATH,
            Route::Dashboard { path, .. } => path,
        }
    }

    pub fn view(&self) -> Option<View> {
        match self {
            Route::Public(_) => None,
            Route::Dashboard { view, .. } => Some(*view),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationOutcome {
    Rendered(Route),
    /// The requested path needs a session the client does not have.
    Redirected(Route),
    /// The path is outside the role's tree and was not rendered.
    Denied { requested: String, fallback: Route },
}

impl NavigationOutcome {
    pub fn route(&self) -> &Route {
        match self {
            NavigationOutcome::Rendered(route) | NavigationOutcome::Redirected(route) => route,
            NavigationOutcome::Denied { fallback, .. } => fallback,
        }
    }
}

/// Maps the session's role claim onto a dashboard shell and keeps the
/// current route. The route lives only in memory.
pub struct RoleRouter {
    sessions: SessionStore,
    trees: BTreeMap<Role, NavigationTree>,
    current: Route,
}

impl RoleRouter {
    pub fn new(sessions: SessionStore) -> Self {
        let trees = Role::ALL
            .into_iter()
            .map(|role| (role, NavigationTree::for_role(role)))
            .collect();
        Self {
            sessions,
            trees,
            current: Route::Public(PublicView::Landing),
        }
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    pub fn tree(&self, role: Role) -> &NavigationTree {
        // every role is inserted in `new`
        &self.trees[&role]
    }

    pub fn default_route(&self, role: Role) -> Route {
        let (path, view) = self.tree(role).default_leaf();
        Route::Dashboard { role, path, view }
    }

    /// Select the shell for the current session and land on its default
    /// segment. Used after login and on a fresh load.
    pub fn dispatch(&mut self) -> Result<Route> {
        let route = match self.sessions.current()? {
            None => Route::Public(PublicView::Landing),
            Some(session) => self.landing_for(&session),
        };
        info!(path = route.path(), "dispatched");
        self.current = route.clone();
        Ok(route)
    }

    pub fn navigate(&mut self, path: &str) -> Result<NavigationOutcome> {
        let trimmed = path.trim_matches('/');
        let outcome = match trimmed {
            "" => NavigationOutcome::Rendered(Route::Public(PublicView::Landing)),
            LOGIN_PATH => NavigationOutcome::Rendered(Route::Public(PublicView::Login)),
            _ => self.navigate_protected(trimmed)?,
        };

        match &outcome {
            NavigationOutcome::Rendered(route) => info!(path = route.path(), "navigated"),
            NavigationOutcome::Redirected(route) => {
                info!(requested = trimmed, path = route.path(), "redirected")
            }
            NavigationOutcome::Denied { requested, fallback } => {
                warn!(requested = %requested, fallback = fallback.path(), "navigation denied")
            }
        }
        self.current = outcome.route().clone();
        Ok(outcome)
    }

    /// Forget the current route, as after logout.
    pub fn reset(&mut self) {
        self.current = Route::Public(PublicView::Landing);
    }

    fn landing_for(&self, session: &Session) -> Route {
        match &session.role {
            RoleClaim::Known(role) => self.default_route(*role),
            RoleClaim::Unrecognized(raw) => {
                warn!(role = %raw, "unrecognized role claim, routing to landing");
                Route::Public(PublicView::Landing)
            }
        }
    }

    fn navigate_protected(&self, path: &str) -> Result<NavigationOutcome> {
        let Some(session) = self.sessions.current()? else {
            return Ok(NavigationOutcome::Redirected(Route::Public(PublicView::Login)));
        };

        let role = match &session.role {
            RoleClaim::Known(role) => *role,
            RoleClaim::Unrecognized(_) => {
                return Ok(NavigationOutcome::Redirected(self.landing_for(&session)));
            }
        };

        Ok(match self.tree(role).resolve(path) {
            Some((path, view)) => NavigationOutcome::Rendered(Route::Dashboard { role, path, view }),
            None => NavigationOutcome::Denied {
                requested: path.to_string(),
                fallback: self.default_route(role),
            },
        })
    }
}
