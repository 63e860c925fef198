//! Route guard: the pure authorization decision run before every navigation.

use crate::routing::table::{Resolution, RoutePolicy, RouteTable};
use crate::session::{Role, Session};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Redirect chains are short in practice (one hop); the bound only protects
/// against a degenerate hand-written table.
const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

/// Landing path for a (possibly absent or unrecognized) role.
pub fn role_home(role: Option<Role>) -> &'static str {
    role.map(Role::home).unwrap_or("/services")
}

/// Decide whether the session may enter a route with the given policy.
///
/// Synchronous and pure: the target view must not mount until this has
/// returned. Guest-only routes are checked first, mirroring the decision
/// table: an authenticated user is bounced to their role home, a guest is
/// let through regardless of any role requirement on the segment.
pub fn decide(session: &Session, policy: &RoutePolicy) -> Decision {
    if policy.requires_guest {
        return if session.is_authenticated() {
            Decision::Redirect(role_home(session.role()).to_string())
        } else {
            Decision::Allow
        };
    }

    if policy.requires_auth {
        if !session.is_authenticated() {
            return Decision::Redirect("/login".to_string());
        }
        if let Some(required) = policy.required_role {
            if session.role() != Some(required) {
                return Decision::Redirect(role_home(session.role()).to_string());
            }
        }
    }

    Decision::Allow
}

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// The view at `path` is allowed to mount.
    Mounted { name: String, path: String },
    /// Terminal not-found state; never blocked by the guard.
    NotFound { path: String },
    /// A newer navigation started while this one was deciding.
    Superseded,
}

/// Drives navigations through the guard.
///
/// Redirects are followed to a fixed point, so the caller always receives
/// the final mountable view. Last navigation wins: a stale decision is
/// discarded instead of committed.
pub struct Navigator {
    table: RouteTable,
    generation: AtomicU64,
    current: Mutex<String>,
}

impl Navigator {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            generation: AtomicU64::new(0),
            current: Mutex::new("/".to_string()),
        }
    }

    pub fn current_path(&self) -> String {
        self.current.lock().expect("location lock poisoned").clone()
    }

    pub fn navigate(&self, session: &Session, target: &str) -> NavigationResult {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut path = target.to_string();
        for _ in 0..MAX_REDIRECTS {
            match self.table.resolve(&path) {
                Resolution::NotFound => {
                    return self.commit(generation, NavigationResult::NotFound { path });
                }
                Resolution::Route { name, policy } => match decide(session, &policy) {
                    Decision::Allow => {
                        return self.commit(generation, NavigationResult::Mounted { name, path });
                    }
                    Decision::Redirect(next) => {
                        tracing::debug!("navigation to {} redirected to {}", path, next);
                        if next == path {
                            break;
                        }
                        path = next;
                    }
                },
            }
        }

        tracing::warn!("redirect chain from {} did not settle", target);
        self.commit(generation, NavigationResult::NotFound { path })
    }

    fn commit(&self, generation: u64, result: NavigationResult) -> NavigationResult {
        if self.generation.load(Ordering::SeqCst) != generation {
            return NavigationResult::Superseded;
        }
        if let NavigationResult::Mounted { path, .. } | NavigationResult::NotFound { path } =
            &result
        {
            *self.current.lock().expect("location lock poisoned") = path.clone();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserProfile;

    fn guest() -> Session {
        Session::default()
    }

    fn signed_in(role: Role) -> Session {
        Session {
            access_token: Some("tok".into()),
            refresh_token: Some("ref".into()),
            user: Some(UserProfile {
                id: 9,
                name: "Sam".into(),
                email: "sam@example.com".into(),
                role,
                is_approved: true,
                phone: None,
                services: None,
                experience: None,
                about: None,
                created_at: None,
            }),
        }
    }

    fn guest_policy() -> RoutePolicy {
        RoutePolicy {
            requires_guest: true,
            ..RoutePolicy::default()
        }
    }

    fn auth_policy(role: Option<Role>) -> RoutePolicy {
        RoutePolicy {
            requires_auth: true,
            required_role: role,
            ..RoutePolicy::default()
        }
    }

    #[test]
    fn test_guest_route_allows_unauthenticated() {
        assert_eq!(decide(&guest(), &guest_policy()), Decision::Allow);
    }

    #[test]
    fn test_guest_route_bounces_authenticated_to_role_home() {
        assert_eq!(
            decide(&signed_in(Role::Customer), &guest_policy()),
            Decision::Redirect("/customer/dashboard".into())
        );
        assert_eq!(
            decide(&signed_in(Role::Professional), &guest_policy()),
            Decision::Redirect("/professional/dashboard".into())
        );
        assert_eq!(
            decide(&signed_in(Role::Admin), &guest_policy()),
            Decision::Redirect("/admin/dashboard".into())
        );
        // unrecognized role falls back to the public services page
        assert_eq!(
            decide(&signed_in(Role::Unknown), &guest_policy()),
            Decision::Redirect("/services".into())
        );
    }

    #[test]
    fn test_auth_route_redirects_guests_to_login() {
        // independent of any role requirement
        assert_eq!(
            decide(&guest(), &auth_policy(None)),
            Decision::Redirect("/login".into())
        );
        assert_eq!(
            decide(&guest(), &auth_policy(Some(Role::Admin))),
            Decision::Redirect("/login".into())
        );
    }

    #[test]
    fn test_role_match_allows_and_mismatch_redirects_to_actual_home() {
        assert_eq!(
            decide(&signed_in(Role::Customer), &auth_policy(Some(Role::Customer))),
            Decision::Allow
        );
        // admin hitting a customer route lands on the admin dashboard
        assert_eq!(
            decide(&signed_in(Role::Admin), &auth_policy(Some(Role::Customer))),
            Decision::Redirect("/admin/dashboard".into())
        );
        assert_eq!(
            decide(&signed_in(Role::Unknown), &auth_policy(Some(Role::Customer))),
            Decision::Redirect("/services".into())
        );
    }

    #[test]
    fn test_unrestricted_route_allows_anyone() {
        assert_eq!(decide(&guest(), &RoutePolicy::default()), Decision::Allow);
        assert_eq!(
            decide(&signed_in(Role::Admin), &RoutePolicy::default()),
            Decision::Allow
        );
    }

    #[test]
    fn test_partial_session_is_not_authenticated() {
        // token without a profile must not pass an auth gate
        let mut session = guest();
        session.access_token = Some("tok".into());
        assert_eq!(
            decide(&session, &auth_policy(None)),
            Decision::Redirect("/login".into())
        );
    }

    #[test]
    fn test_navigator_follows_redirect_chain_to_mount() {
        let nav = Navigator::new(RouteTable::fixrify());

        // guest hits a protected page: ends up on the login view
        let result = nav.navigate(&guest(), "/customer/dashboard");
        assert_eq!(
            result,
            NavigationResult::Mounted {
                name: "login".into(),
                path: "/login".into()
            }
        );
        assert_eq!(nav.current_path(), "/login");

        // signed-in customer hits the login page: bounced home in one chain
        let result = nav.navigate(&signed_in(Role::Customer), "/login");
        assert_eq!(
            result,
            NavigationResult::Mounted {
                name: "customer-dashboard".into(),
                path: "/customer/dashboard".into()
            }
        );
    }

    #[test]
    fn test_navigator_not_found_is_terminal() {
        let nav = Navigator::new(RouteTable::fixrify());
        let result = nav.navigate(&guest(), "/no/such/page");
        assert_eq!(
            result,
            NavigationResult::NotFound {
                path: "/no/such/page".into()
            }
        );
    }
}
