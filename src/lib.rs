// Public API for integration tests and the server binary

pub mod config;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod random;
pub mod registry;
pub mod routes;
pub mod session;
pub mod state;
pub mod types;
pub mod ws;
