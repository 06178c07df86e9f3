//! The pulse agent: polls host metrics and reports them to a pulse server.

pub mod agent;
pub mod config;
pub mod sender;
pub mod transport;
