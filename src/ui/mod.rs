//! Server-rendered admin UI

mod handlers;

pub use handlers::{admin, index, login_page, stats};
