//! HTTP surface of the web app.

pub mod api;
pub mod auth;
pub mod chat;
mod cookies;
pub mod error;
pub mod extractor;
pub mod health;
pub mod pages;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use extractor::CurrentSession;
pub use routes::build_router;
pub use state::AppState;
