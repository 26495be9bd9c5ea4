//! Route gating decisions.

use crate::models::{Role, User};
use crate::session::SessionSnapshot;

pub const LOGIN_ROUTE: &str = "/login";
pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const ADMIN_ROUTE: &str = "/admin";
pub const AGENT_ROUTE: &str = "/agent";
pub const HOME_ROUTE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session still being restored; show a spinner.
    Loading,
    Redirect(&'static str),
    Render,
}

/// Pages that need a signed-in user.
pub fn protected_route(session: &SessionSnapshot) -> RouteDecision {
    if session.is_loading {
        RouteDecision::Loading
    } else if !session.is_authenticated {
        RouteDecision::Redirect(LOGIN_ROUTE)
    } else {
        RouteDecision::Render
    }
}

/// Login and registration pages, which a signed-in user skips.
pub fn public_route(session: &SessionSnapshot) -> RouteDecision {
    if session.is_loading {
        RouteDecision::Loading
    } else if session.is_authenticated {
        RouteDecision::Redirect(DASHBOARD_ROUTE)
    } else {
        RouteDecision::Render
    }
}

#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Vec<Role>,
}

impl RoleGuard {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn admin() -> Self {
        Self::new(crate::models::ADMIN_ROLES)
    }

    pub fn agent() -> Self {
        Self::new([Role::Agent])
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    pub fn check(&self, session: &SessionSnapshot) -> RouteDecision {
        if session.is_loading {
            return RouteDecision::Loading;
        }
        match (&session.user, session.is_authenticated) {
            (Some(user), true) if self.allows(user.role) => RouteDecision::Render,
            (Some(_), true) => RouteDecision::Redirect(DASHBOARD_ROUTE),
            _ => RouteDecision::Redirect(LOGIN_ROUTE),
        }
    }
}

/// Landing page for a user after sign-in.
pub fn dashboard_for(user: Option<&User>) -> &'static str {
    match user.map(|u| u.role) {
        None => LOGIN_ROUTE,
        Some(role) if role.is_admin() => ADMIN_ROUTE,
        Some(Role::Agent) => AGENT_ROUTE,
        Some(_) => HOME_ROUTE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> User {
        serde_json::from_value(serde_json::json!({"id": 1, "role": role})).unwrap()
    }

    fn signed_in(role: &str) -> SessionSnapshot {
        SessionSnapshot {
            user: Some(user(role)),
            is_authenticated: true,
            is_loading: false,
            error: None,
        }
    }

    fn signed_out() -> SessionSnapshot {
        SessionSnapshot {
            is_loading: false,
            ..SessionSnapshot::initial()
        }
    }

    #[test]
    fn loading_wins_over_everything() {
        let loading = SessionSnapshot::initial();
        assert_eq!(protected_route(&loading), RouteDecision::Loading);
        assert_eq!(public_route(&loading), RouteDecision::Loading);
        assert_eq!(RoleGuard::admin().check(&loading), RouteDecision::Loading);
    }

    #[test]
    fn protected_and_public_routes() {
        assert_eq!(protected_route(&signed_out()), RouteDecision::Redirect("/login"));
        assert_eq!(protected_route(&signed_in("trader")), RouteDecision::Render);
        assert_eq!(public_route(&signed_in("trader")), RouteDecision::Redirect("/dashboard"));
        assert_eq!(public_route(&signed_out()), RouteDecision::Render);
    }

    #[test]
    fn role_guard_redirects() {
        let guard = RoleGuard::admin();
        assert_eq!(guard.check(&signed_out()), RouteDecision::Redirect("/login"));
        assert_eq!(guard.check(&signed_in("trader")), RouteDecision::Redirect("/dashboard"));
        assert_eq!(guard.check(&signed_in("super_admin")), RouteDecision::Render);
        assert_eq!(RoleGuard::agent().check(&signed_in("agent")), RouteDecision::Render);
    }

    #[test]
    fn dashboard_per_role() {
        assert_eq!(dashboard_for(None), "/login");
        assert_eq!(dashboard_for(Some(&user("admin"))), "/admin");
        assert_eq!(dashboard_for(Some(&user("super_admin"))), "/admin");
        assert_eq!(dashboard_for(Some(&user("agent"))), "/agent");
        assert_eq!(dashboard_for(Some(&user("trader"))), "/");
        assert_eq!(dashboard_for(Some(&user("master"))), "/");
    }
}
