//! Fixrify Client Core Library
//!
//! This crate provides the client-side core for the Fixrify service-booking
//! platform:
//! - Session management (durable token storage, login/registration/logout)
//! - Request pipeline (bearer attachment, error classification, transparent
//!   single-flight credential renewal on 401)
//! - Route guard (role-based navigation decisions over a declarative,
//!   inheritable route table)
//! - Export retrieval (server-built report artifacts)
//!
//! # Features
//!
//! - `keyring-storage` (default): Use platform keyring for session storage
//! - `file-storage`: Use file-based session storage (for headless Linux)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fixrify_core::api::{load_endpoint_config, ApiClient, HttpTransport};
//! use fixrify_core::error::TracingSink;
//! use fixrify_core::routing::{Navigator, RouteTable};
//! use fixrify_core::session::{SessionManager, TokenStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_endpoint_config();
//!     let store = Arc::new(TokenStore::open()?);
//!     let transport = Arc::new(HttpTransport::new(&config)?);
//!     let client = ApiClient::new(transport, store.clone(), Arc::new(TracingSink));
//!     let manager = SessionManager::new(store.clone(), client);
//!
//!     let user = manager.login("pat@example.com", "secret").await?;
//!     println!("signed in as {}", user.name);
//!
//!     let navigator = Navigator::new(RouteTable::fixrify());
//!     let landing = navigator.navigate(&manager.session(), user.role.home());
//!     println!("landed on {:?}", landing);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod routing;
pub mod session;

// Re-export commonly used types
pub use api::{ApiClient, EndpointConfig, Exports, HttpTransport};
pub use error::{ApiError, EventSink, TracingSink};
pub use routing::{decide, Decision, NavigationResult, Navigator, RoutePolicy, RouteTable};
pub use session::{Role, Session, SessionManager, TokenStore, UserProfile};
