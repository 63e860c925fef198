//! Routing: the declarative route table and the navigation guard.

mod guard;
mod table;

pub use guard::{decide, role_home, Decision, NavigationResult, Navigator};
pub use table::{Resolution, Route, RoutePolicy, RouteTable, SegmentPolicy};
