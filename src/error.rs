//! Per-module error types for the coordination core.
//!
//! Each component gets its own `thiserror`-derived enum rather than one
//! crate-wide error. Call sites that only need to propagate failures can
//! still wrap these in `anyhow::Result`.

use thiserror::Error;

/// Errors raised while constructing or updating a `ProjectContext`.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("priority matrix must sum to 1.0 (+/- 0.01), got {0}")]
    PriorityMatrixInvalid(f64),

    #[error("value out of range [0,1] for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("deadline must be in the future at construction time")]
    DeadlineInPast,

    #[error("invalid field update: {0}")]
    InvalidUpdate(String),

    #[error("field validation failed: {0}")]
    FieldValidation(#[from] validator::ValidationErrors),
}

/// Errors raised by the decision-authority (RACI) matrix.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("unknown decision kind: {0}")]
    NotFound(String),
}

/// Errors raised by the Context State Manager.
#[derive(Debug, Error)]
pub enum CsmError {
    #[error("project context not found: {0}")]
    ContextNotFound(String),

    #[error(transparent)]
    Validation(#[from] ContextError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

/// Errors surfaced by agent execution and the lifecycle wrapper.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("task execution failed: {0}")]
    ExecutionFailed(String),

    #[error(transparent)]
    Csm(#[from] CsmError),
}

/// Errors raised by message validation and routing.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message failed validation: {0}")]
    InvalidMessage(String),

    #[error("message expired")]
    Expired,
}

/// Errors raised by the agent registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("no available agent found for task")]
    NoAvailableAgent,
}

/// Errors raised by the task orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("workflow is not in pending state")]
    NotPending,

    #[error("duplicate step id: {0}")]
    DuplicateStepId(String),

    #[error("dependency {dep} of step {step} does not exist in this workflow")]
    UnknownDependency { step: String, dep: String },

    #[error("workflow dependency graph contains a cycle")]
    CyclicDependency,
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}
