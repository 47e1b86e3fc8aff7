//! In-memory session storage.
//!
//! Holds two kinds of entries with separate lifetimes: logins waiting for the
//! identity provider's callback, and authenticated user sessions.

mod store;

pub use store::{PendingAuth, Session, SessionStore, SweepStats, unix_now};
