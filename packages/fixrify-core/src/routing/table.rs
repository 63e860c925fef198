//! Declarative route table with inheritable access policies.
//!
//! Each route segment may declare any of `requires_guest`, `requires_auth`
//! or a required role; a field left undeclared is inherited from the nearest
//! ancestor that declares it, walking root to leaf. A path that matches no
//! declared route resolves to a terminal not-found state which the guard
//! never blocks.

use crate::session::Role;

/// Policy fields as declared on a single segment. `None` means "inherit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentPolicy {
    pub requires_guest: Option<bool>,
    pub requires_auth: Option<bool>,
    pub role: Option<Role>,
}

/// Fully resolved policy for a navigable route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    pub requires_guest: bool,
    pub requires_auth: bool,
    pub required_role: Option<Role>,
}

impl RoutePolicy {
    fn apply(mut self, segment: &SegmentPolicy) -> Self {
        if let Some(guest) = segment.requires_guest {
            self.requires_guest = guest;
        }
        if let Some(auth) = segment.requires_auth {
            self.requires_auth = auth;
        }
        if let Some(role) = segment.role {
            self.required_role = Some(role);
        }
        self
    }
}

/// One node of the route tree. An empty segment is an index route (layout
/// root or default child); only named routes are navigable views.
#[derive(Debug, Clone)]
pub struct Route {
    segment: String,
    name: Option<String>,
    policy: SegmentPolicy,
    children: Vec<Route>,
}

impl Route {
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            name: None,
            policy: SegmentPolicy::default(),
            children: Vec::new(),
        }
    }

    pub fn named(segment: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(segment)
        }
    }

    pub fn guest(mut self) -> Self {
        self.policy.requires_guest = Some(true);
        self
    }

    pub fn auth(mut self) -> Self {
        self.policy.requires_auth = Some(true);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.policy.role = Some(role);
        self
    }

    pub fn child(mut self, route: Route) -> Self {
        self.children.push(route);
        self
    }
}

/// Outcome of resolving a target path against the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Route { name: String, policy: RoutePolicy },
    NotFound,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    roots: Vec<Route>,
}

impl RouteTable {
    pub fn new(roots: Vec<Route>) -> Self {
        Self { roots }
    }

    /// Resolve a path to a navigable route and its effective policy.
    pub fn resolve(&self, path: &str) -> Resolution {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for root in &self.roots {
            if let Some((name, policy)) = match_route(root, &segments, RoutePolicy::default()) {
                return Resolution::Route { name, policy };
            }
        }
        Resolution::NotFound
    }

    /// The route table of the Fixrify dashboard: public pages, then one
    /// policy-bearing subtree per role.
    pub fn fixrify() -> Self {
        Self::new(vec![
            Route::new("")
                .child(Route::named("", "home").guest())
                .child(Route::named("login", "login").guest())
                .child(Route::named("register", "register").guest())
                .child(Route::new("admin").child(Route::named("login", "admin-login").guest()))
                .child(Route::named("services", "services"))
                .child(Route::named("about", "about"))
                .child(Route::named("contact", "contact"))
                .child(Route::named("privacy", "privacy"))
                .child(Route::named("terms", "terms")),
            Route::new("customer")
                .auth()
                .role(Role::Customer)
                .child(Route::named("dashboard", "customer-dashboard"))
                .child(Route::named("services", "customer-services"))
                .child(Route::named("requests", "customer-requests"))
                .child(Route::named("profile", "customer-profile")),
            Route::new("professional")
                .auth()
                .role(Role::Professional)
                .child(Route::named("dashboard", "professional-dashboard"))
                .child(Route::named("requests", "professional-requests"))
                .child(Route::named("profile", "professional-profile")),
            Route::new("admin")
                .auth()
                .role(Role::Admin)
                .child(Route::named("dashboard", "admin-dashboard"))
                .child(Route::named("services", "admin-services"))
                .child(Route::named("users", "admin-users"))
                .child(Route::named("reports", "admin-reports")),
        ])
    }
}

fn match_route(
    route: &Route,
    segments: &[&str],
    inherited: RoutePolicy,
) -> Option<(String, RoutePolicy)> {
    let rest: &[&str] = if route.segment.is_empty() {
        segments
    } else if segments.first() == Some(&route.segment.as_str()) {
        &segments[1..]
    } else {
        return None;
    };

    let effective = inherited.apply(&route.policy);

    if rest.is_empty() {
        if let Some(name) = &route.name {
            return Some((name.clone(), effective));
        }
    }
    for child in &route.children {
        // An index child ("") must not re-consume the parent's remainder
        // unless it terminates there.
        if let Some(matched) = match_route(child, rest, effective) {
            return Some(matched);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::fixrify()
    }

    fn policy_of(path: &str) -> RoutePolicy {
        match table().resolve(path) {
            Resolution::Route { policy, .. } => policy,
            Resolution::NotFound => panic!("{path} did not resolve"),
        }
    }

    #[test]
    fn test_public_routes_resolve() {
        for (path, name) in [
            ("/", "home"),
            ("/login", "login"),
            ("/register", "register"),
            ("/admin/login", "admin-login"),
            ("/services", "services"),
            ("/about", "about"),
        ] {
            match table().resolve(path) {
                Resolution::Route { name: n, .. } => assert_eq!(n, name, "path {path}"),
                Resolution::NotFound => panic!("{path} did not resolve"),
            }
        }
    }

    #[test]
    fn test_guest_only_pages() {
        assert!(policy_of("/login").requires_guest);
        assert!(policy_of("/").requires_guest);
        assert!(policy_of("/admin/login").requires_guest);
        // shared public pages carry no requirement at all
        let services = policy_of("/services");
        assert_eq!(services, RoutePolicy::default());
    }

    #[test]
    fn test_role_subtrees_inherit_auth_and_role() {
        let dashboard = policy_of("/customer/dashboard");
        assert!(dashboard.requires_auth);
        assert_eq!(dashboard.required_role, Some(Role::Customer));

        let reports = policy_of("/admin/reports");
        assert!(reports.requires_auth);
        assert_eq!(reports.required_role, Some(Role::Admin));

        let profile = policy_of("/professional/profile");
        assert_eq!(profile.required_role, Some(Role::Professional));
        assert!(!profile.requires_guest);
    }

    #[test]
    fn test_child_declaration_overrides_ancestor() {
        let table = RouteTable::new(vec![Route::new("portal")
            .auth()
            .role(Role::Admin)
            .child(Route::named("settings", "settings"))
            .child(Route::named("help", "help").role(Role::Customer))]);

        match table.resolve("/portal/settings") {
            Resolution::Route { policy, .. } => {
                assert_eq!(policy.required_role, Some(Role::Admin))
            }
            Resolution::NotFound => panic!("settings did not resolve"),
        }
        match table.resolve("/portal/help") {
            Resolution::Route { policy, .. } => {
                // nearest declaration wins
                assert_eq!(policy.required_role, Some(Role::Customer));
                assert!(policy.requires_auth, "auth still inherited from ancestor");
            }
            Resolution::NotFound => panic!("help did not resolve"),
        }
    }

    #[test]
    fn test_unmatched_paths_are_not_found() {
        assert_eq!(table().resolve("/nope"), Resolution::NotFound);
        assert_eq!(table().resolve("/customer"), Resolution::NotFound);
        assert_eq!(table().resolve("/customer/dashboard/extra"), Resolution::NotFound);
        assert_eq!(table().resolve("/admin"), Resolution::NotFound);
    }

    #[test]
    fn test_trailing_slashes_are_ignored() {
        assert_eq!(policy_of("/customer/dashboard/"), policy_of("/customer/dashboard"));
        assert_eq!(policy_of("login"), policy_of("/login"));
    }
}
