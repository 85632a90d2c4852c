//! HTTP boundary: server, routes, sessions, response encoding

pub mod encoding;
pub mod middleware;
pub mod proto;
pub mod routes;
pub mod server;
pub mod session;

pub use server::{create_router, run_server, AppState};
pub use session::{Session, SessionStore};
