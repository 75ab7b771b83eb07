//! Gateway module - the request orchestrator and its error taxonomy.

mod gateway_errors;
mod gateway_model;
mod orchestrator;


pub use gateway_errors::GatewayError;
pub use gateway_model::{BackoffPolicy, ExecuteRequest, OrchestratorConfig, ProviderHealth};
pub use orchestrator::RequestOrchestrator;
