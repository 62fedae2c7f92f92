//! HTTP handlers, grouped by domain, plus the router and shared state.

pub mod chat;
pub mod health;
pub mod router;
pub mod state;
pub mod todos;
pub mod users;

pub use router::{build_protected_routes, build_public_routes, build_router};
pub use state::{AppContext, AppState};
