//! Web server module
//!
//! JSON API over the consolidation engine.

mod handlers;
mod routes;
mod state;

pub use handlers::ConsolidateParams;
pub use routes::create_router;
pub use state::AppState;
