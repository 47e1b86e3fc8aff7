//! Warehouse access.
//!
//! Two ways into the warehouse, both authorised by the user's OAuth token:
//!
//! - a session login that mints the short-lived REST token used for agent
//!   runs ([`SnowflakeConnector`], closed after each turn);
//! - the SQL statements API for one-shot queries ([`StatementClient`]).

mod client;
mod statements;
mod types;


pub use client::{
    SnowflakeConnector, SnowflakeSession, WarehouseConnection, WarehouseConnector, WarehouseError,
};
pub use statements::StatementClient;
pub use types::{AgentSummary, SessionContext, StatementResult, WarehouseLogin};
