//! Route access decisions from session state.
//!
//! Pure and synchronous: session state must already be resolved before a
//! navigation is evaluated. The actual view transition belongs to the UI.

use crate::session::Session;

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/";

/// Role granting access to administrative routes.
pub const ADMIN_ROLE: &str = "admin";

/// Access requirements attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Full destination path, preserved through a login redirect.
    pub path: String,
    pub requires_auth: bool,
    pub requires_admin: bool,
}

impl RouteMeta {
    /// A route anyone may visit.
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// A route requiring a signed-in session.
    pub fn authenticated(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requires_auth: true,
            requires_admin: false,
        }
    }

    /// A route requiring the administrative role.
    pub fn admin(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requires_auth: true,
            requires_admin: true,
        }
    }
}

/// Why a navigation was redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    AuthenticationRequired,
    PermissionDenied,
}

/// Outcome of evaluating a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectTo {
        path: String,
        reason: RedirectReason,
    },
}

/// Decides a navigation from route metadata and the current session.
///
/// Precedence: missing authentication redirects to the login screen with
/// the original destination preserved; a missing administrative role
/// redirects home with a permission-denied reason; everything else is
/// allowed.
pub fn evaluate(meta: &RouteMeta, session: &Session) -> RouteDecision {
    if meta.requires_auth && !session.authenticated() {
        return RouteDecision::RedirectTo {
            path: login_redirect(&meta.path),
            reason: RedirectReason::AuthenticationRequired,
        };
    }

    if meta.requires_admin && !has_role(session, ADMIN_ROLE) {
        return RouteDecision::RedirectTo {
            path: format!("{HOME_ROUTE}?error=permission_denied"),
            reason: RedirectReason::PermissionDenied,
        };
    }

    RouteDecision::Allow
}

/// Builds the login path carrying the original destination as the
/// post-login redirect target.
pub fn login_redirect(original: &str) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", original)
        .finish();
    format!("{LOGIN_ROUTE}?{query}")
}

fn has_role(session: &Session, role: &str) -> bool {
    session.user.as_ref().is_some_and(|user| user.has_role(role))
}
