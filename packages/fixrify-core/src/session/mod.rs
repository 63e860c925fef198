//! Client session: durable token storage and the session manager.

mod manager;
mod store;
mod types;

pub use manager::{NewUser, ProfileUpdate, SessionManager};
pub use store::{storage_info, TokenStore};
pub use types::{Role, Session, UserProfile};
