pub mod compression;
pub mod controller;
pub mod error;
pub mod executor;
pub mod operations;
pub mod orchestrator;
pub mod prestage;
pub mod prompts;
pub mod registry;
pub mod truncate;

#[cfg(test)]
mod testing;

pub use error::EngineError;
pub use executor::OperationExecutor;
pub use orchestrator::{Orchestrator, OrchestratorConfig, RetrievalBudget, SessionOutcome, SessionReport};
pub use registry::OperationRegistry;
