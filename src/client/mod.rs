//! Client half of the auth flow: a typed HTTP client, a durable session
//! store, and the orchestrating context that ties them together.

pub mod api;
pub mod context;
pub mod session;

pub use api::ApiClient;
pub use context::AuthContext;
pub use session::{SessionStore, StoredSession};
