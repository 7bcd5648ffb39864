// ── Routes and the navigator ──
//
// The navigator tracks which view is active, enforces the auth guard,
// and owns the `ViewScope` of the active view so leaving a view cancels
// whatever it was still loading. The wallet root feeds it session events.

use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::cache::ViewScope;
use crate::session::{SessionEvent, SessionManager};

/// Application views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Transactions,
    NewTransaction,
    Categories,
    Profile,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Transactions => "/transactions",
            Self::NewTransaction => "/transactions/new",
            Self::Categories => "/categories",
            Self::Profile => "/profile",
        }
    }

    /// Reachable without a session.
    pub fn is_public(self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// Where a navigation to `self` ends up given the auth state.
    ///
    /// Private views need a session; signed-in users skip the auth views.
    pub fn guard(self, authenticated: bool) -> Route {
        match (self.is_public(), authenticated) {
            (false, false) => Self::Login,
            (true, true) => Self::Dashboard,
            _ => self,
        }
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    /// Unknown paths, and `/`, land on the dashboard.
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim_end_matches('/');
        let route = match trimmed {
            "/login" => Self::Login,
            "/register" => Self::Register,
            "/transactions" => Self::Transactions,
            "/transactions/new" => Self::NewTransaction,
            "/categories" => Self::Categories,
            "/profile" => Self::Profile,
            _ => Self::Dashboard,
        };
        Ok(route)
    }
}

/// Tracks the active view.
pub struct Navigator {
    session: Arc<SessionManager>,
    route: watch::Sender<Route>,
    scope: Mutex<ViewScope>,
}

impl Navigator {
    pub fn new(session: Arc<SessionManager>) -> Self {
        let initial = Route::Dashboard.guard(session.is_authenticated());
        let (route, _) = watch::channel(initial);
        Self {
            session,
            route,
            scope: Mutex::new(ViewScope::new()),
        }
    }

    pub fn current(&self) -> Route {
        *self.route.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.route.subscribe()
    }

    /// Scope of the active view.
    pub fn scope(&self) -> ViewScope {
        self.scope
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Move to `target` (after the auth guard), cancelling the previous
    /// view's pending work. Returns the route actually shown and the
    /// new view's scope.
    pub fn navigate(&self, target: Route) -> (Route, ViewScope) {
        let route = target.guard(self.session.is_authenticated());
        let scope = ViewScope::new();
        {
            let mut current = self.scope.lock().unwrap_or_else(PoisonError::into_inner);
            current.cancel();
            *current = scope.clone();
        }
        if route != target {
            debug!(%target, %route, "navigation redirected");
        }
        self.route.send_replace(route);
        (route, scope)
    }

    /// React to a session transition: sign-in leaves the auth views for
    /// the dashboard, sign-out and expiry leave private views for login.
    ///
    /// A no-op when the active view is already on the right side of the
    /// guard, so a transition seen twice navigates once.
    pub fn on_session_event(&self, event: SessionEvent) {
        let target = match event {
            SessionEvent::LoggedIn | SessionEvent::Registered => Route::Dashboard,
            SessionEvent::LoggedOut | SessionEvent::Expired => Route::Login,
            SessionEvent::Restored | SessionEvent::Refreshed | SessionEvent::UserUpdated => return,
        };
        if self.current().is_public() != target.is_public() {
            self.navigate(target);
        }
    }
}
