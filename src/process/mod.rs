pub mod engine;
pub mod orchestrator;
