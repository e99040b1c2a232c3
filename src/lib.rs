// Library crate for integration tests; the binary in main.rs builds on it.

pub mod activity;
pub mod config;
pub mod error;
pub mod process;
pub mod report;
pub mod routes;
pub mod run_config;
pub mod script;
pub mod server;
pub mod state;
