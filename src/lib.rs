//! Intelligent coordination core for digital-employee agent platforms.
//!
//! Composes the Context State Manager (C3), the decision-authority matrix
//! (C2), the agent registry (C6), and the DAG task orchestrator (C7) into a
//! single facade. Agents and the HTTP/CLI surfaces that embed this crate are
//! expected to hold their own `Arc<ContextStateManager>` /
//! `Arc<AgentRegistry>` rather than reach through a global singleton; see
//! `CoordinationCore` for the convenience composition.

pub mod agent;
pub mod authority;
pub mod config;
pub mod context;
pub mod csm;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod registry;

pub use agent::{
    BaseAgent, ContextAwareAgent, ContextualDecision, DecisionStrategy, Task, TaskPriority,
    TaskResult,
};
pub use authority::{DecisionAuthorityMatrix, RaciRole};
pub use config::CoreConfig;
pub use context::{BusinessContext, LifecyclePhase, ProjectContext, TimePressure};
pub use csm::{ContextEvent, ContextStateManager, RecommendationBundle};
pub use message::{Message, MessageRouter};
pub use orchestrator::{TaskOrchestrator, Workflow, WorkflowDefinition, WorkflowStatus};
pub use registry::AgentRegistry;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

/// Installs a `tracing-subscriber` formatter honoring `RUST_LOG`. An
/// embedding binary calls this once at startup; the library itself never
/// installs a subscriber on its own initiative.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Aggregate health of the composed core.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded { issues: Vec<String> },
}

/// Ties the CSM, registry, and orchestrator together behind one handle.
///
/// This is a convenience composition, not a mandatory entry point: every
/// sub-service is a plain `Arc<T>` that callers may also construct and wire
/// up directly (e.g. to hand a bare `Arc<ContextStateManager>` to an agent
/// that only needs context reads).
pub struct CoordinationCore {
    pub csm: Arc<ContextStateManager>,
    pub registry: Arc<AgentRegistry>,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub authority: DecisionAuthorityMatrix,
}

impl CoordinationCore {
    /// Builds all sub-services from `config`, but does not start any
    /// background task yet -- call `start` once the caller is ready to run.
    pub fn new(config: CoreConfig) -> Self {
        let csm = ContextStateManager::new(config.csm);
        let registry = AgentRegistry::new(config.registry);
        let orchestrator = TaskOrchestrator::new(registry.clone(), config.orchestrator);
        let authority = DecisionAuthorityMatrix::new();

        Self {
            csm,
            registry,
            orchestrator,
            authority,
        }
    }

    /// Spawns the registry's health loop, the orchestrator's workflow-tick
    /// loop, and the CSM's cache sweeper / idle-context monitor. Returns
    /// their join handles so an embedding binary can await clean shutdown.
    pub fn start(&self) -> Vec<tokio::task::JoinHandle<()>> {
        info!("starting coordination core");
        vec![
            self.registry.start(),
            self.orchestrator.start(),
            tokio::spawn(self.csm.clone().run_cache_sweeper()),
            tokio::spawn(self.csm.clone().run_idle_context_monitor()),
        ]
    }

    pub fn stop(&self) {
        self.registry.stop();
        self.orchestrator.stop();
        info!("coordination core stopped");
    }

    /// Register a project context through the facade, for callers that
    /// don't want to reach into `csm` directly.
    pub async fn register_project_context(&self, ctx: ProjectContext) {
        self.csm.register(ctx).await;
    }

    pub async fn update_project_context(
        &self,
        project_id: &str,
        updates: &context::ContextFieldUpdates,
        updated_by: impl Into<String>,
    ) -> Result<u64, error::CsmError> {
        self.csm.update(project_id, updates, updated_by).await
    }

    pub async fn detect_conflicts(
        &self,
        project_id: &str,
        proposals: &[csm::DecisionProposal],
    ) -> Result<Vec<csm::ConflictDescriptor>, error::CsmError> {
        self.csm.detect_conflicts(project_id, proposals).await
    }

    /// Registers a project context and submits a workflow against it in one
    /// call, for an embedding binary that just wants to get a workflow
    /// running and doesn't care to match `CsmError` against
    /// `OrchestratorError` separately -- the two live in one `anyhow::Result`
    /// since this call only needs to propagate a failure, not match on it.
    pub async fn bootstrap_workflow(
        &self,
        ctx: ProjectContext,
        definition: orchestrator::WorkflowDefinition,
    ) -> anyhow::Result<String> {
        self.register_project_context(ctx).await;
        let workflow_id = self
            .orchestrator
            .create_workflow(definition)
            .await
            .context("failed to create workflow")?;
        self.orchestrator
            .start_workflow(&workflow_id)
            .await
            .context("failed to start workflow")?;
        Ok(workflow_id)
    }

    /// Aggregate health across the CSM, registry, and orchestrator. None of
    /// the three sub-services currently have a failure mode that survives
    /// construction, so this is a structural placeholder a caller can extend
    /// as sub-services grow real liveness checks.
    pub async fn health_check(&self) -> HealthStatus {
        let status = self.csm.status().await;
        let mut issues = Vec::new();

        if status.active_contexts == 0 {
            // Not itself unhealthy, just worth surfacing to an operator
            // checking in on a fresh deployment.
            issues.push("no project contexts registered yet".to_string());
        }

        if issues.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded { issues }
        }
    }
}
