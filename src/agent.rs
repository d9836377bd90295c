//! C4: the agent base and context-aware agent framework — lifecycle,
//! strategy catalog, and the contextual decision protocol.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::csm::{ContextStateManager, RecommendationBundle};
use crate::error::AgentError;

/// Agent execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Error,
    Offline,
}

/// Task priority levels, ordered urgent-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Urgent,
    High,
    Medium,
    Low,
}

/// A unit of work routed to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub input_data: HashMap<String, Value>,
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
    pub context: Option<HashMap<String, Value>>,
}

impl Task {
    pub fn new(description: impl Into<String>, input_data: HashMap<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            input_data,
            priority: TaskPriority::Medium,
            created_at: Utc::now(),
            context: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context(mut self, context: HashMap<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// `task.context.project_id`, if present.
    pub fn project_id(&self) -> Option<String> {
        self.context
            .as_ref()
            .and_then(|c| c.get("project_id"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn required_capabilities(&self) -> Vec<String> {
        self.context
            .as_ref()
            .and_then(|c| c.get("required_capabilities"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Result of executing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    pub output_data: HashMap<String, Value>,
    pub error_message: Option<String>,
    pub execution_time: Option<f64>,
    pub metadata: Option<HashMap<String, Value>>,
}

impl TaskResult {
    pub fn ok(task_id: impl Into<String>, output_data: HashMap<String, Value>) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output_data,
            error_message: None,
            execution_time: None,
            metadata: None,
        }
    }

    pub fn failure(task_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output_data: HashMap::new(),
            error_message: Some(error_message.into()),
            execution_time: None,
            metadata: None,
        }
    }
}

/// A named, parameterized policy an agent can apply to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionStrategy {
    pub strategy_type: String,
    pub approach: String,
    pub parameters: HashMap<String, Value>,
    pub rationale: String,
    pub quality_target: f64,
    pub speed_factor: f64,
    pub resource_intensity: f64,
}

impl DecisionStrategy {
    pub fn balanced() -> Self {
        Self {
            strategy_type: "balanced".to_string(),
            approach: "Standard balanced approach".to_string(),
            parameters: HashMap::new(),
            rationale: "Default strategy balancing speed, quality, and cost".to_string(),
            quality_target: 0.7,
            speed_factor: 1.0,
            resource_intensity: 0.5,
        }
    }

    pub fn fast_delivery() -> Self {
        Self {
            strategy_type: "fast_delivery".to_string(),
            approach: "Speed-optimized approach".to_string(),
            parameters: HashMap::from([(
                "optimize_for".to_string(),
                Value::String("speed".to_string()),
            )]),
            rationale: "Prioritize delivery speed over perfection".to_string(),
            quality_target: 0.6,
            speed_factor: 1.5,
            resource_intensity: 0.7,
        }
    }

    pub fn high_quality() -> Self {
        Self {
            strategy_type: "high_quality".to_string(),
            approach: "Quality-optimized approach".to_string(),
            parameters: HashMap::from([(
                "optimize_for".to_string(),
                Value::String("quality".to_string()),
            )]),
            rationale: "Prioritize quality and long-term maintainability".to_string(),
            quality_target: 0.9,
            speed_factor: 0.8,
            resource_intensity: 0.6,
        }
    }

    /// The base three-entry catalog every context-aware agent starts from.
    pub fn default_catalog() -> HashMap<String, DecisionStrategy> {
        HashMap::from([
            ("balanced".to_string(), Self::balanced()),
            ("fast_delivery".to_string(), Self::fast_delivery()),
            ("high_quality".to_string(), Self::high_quality()),
        ])
    }
}

/// A strategy choice bound to a specific task, with the context snapshot
/// that justified it. Never mutated once appended to an agent's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextualDecision {
    pub decision_id: String,
    pub agent_id: String,
    pub task_id: String,
    pub strategy: DecisionStrategy,
    pub context_snapshot: Option<Value>,
    pub estimated_time_days: f64,
    pub resource_demand: f64,
    pub dependencies: Vec<String>,
    pub risks: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Abstract base for all agents in the coordination core.
#[async_trait]
pub trait BaseAgent: Send + Sync {
    fn agent_id(&self) -> &str;
    fn agent_type(&self) -> &str;
    fn capabilities(&self) -> &[String];
    fn status(&self) -> AgentStatus;
    fn set_status(&self, status: AgentStatus);

    /// Execute a task and return the result. Implemented per agent kind.
    async fn execute(&self, task: &Task) -> Result<TaskResult, AgentError>;

    /// Default keyword-substring match over declared capabilities. Override
    /// for an explicit capability declaration.
    fn can_handle(&self, task: &Task) -> bool {
        let required = task.required_capabilities();
        if required.is_empty() {
            return true;
        }
        required
            .iter()
            .any(|req| self.capabilities().iter().any(|cap| cap.contains(req.as_str())))
    }

    async fn initialize(&self) {
        info!(agent_id = self.agent_id(), "initializing agent");
        self.set_status(AgentStatus::Idle);
    }

    async fn shutdown(&self) {
        info!(agent_id = self.agent_id(), "shutting down agent");
        self.set_status(AgentStatus::Offline);
    }

    async fn health_check(&self) -> bool {
        self.status() != AgentStatus::Error
    }

    /// Execute with full lifecycle management: timestamps, status
    /// transitions, and translation of any failure into a `TaskResult`.
    /// The single site that turns an unhandled error into a structured
    /// result instead of propagating an exception.
    async fn execute_with_lifecycle(&self, task: &Task) -> TaskResult {
        let start = Instant::now();
        self.set_status(AgentStatus::Busy);

        let result = match self.execute(task).await {
            Ok(mut result) => {
                result.execution_time = Some(start.elapsed().as_secs_f64());
                info!(task_id = %task.id, "task completed successfully");
                self.set_status(AgentStatus::Idle);
                result
            }
            Err(err) => {
                error!(task_id = %task.id, error = %err, "task execution failed");
                self.set_status(AgentStatus::Error);
                let mut result = TaskResult::failure(task.id.clone(), err.to_string());
                result.execution_time = Some(start.elapsed().as_secs_f64());
                result
            }
        };

        result
    }
}

/// Base time in days by task priority: urgent/high/medium/low.
fn base_time_for_priority(priority: TaskPriority) -> f64 {
    match priority {
        TaskPriority::Urgent => 0.5,
        TaskPriority::High => 1.0,
        TaskPriority::Medium => 2.0,
        TaskPriority::Low => 3.0,
    }
}

/// Extension point implemented once per agent kind (QA, architect, ...).
/// `select_strategy` is pure; `execute_with_strategy` is the impure work
/// body. The framework around these two hooks (estimation, risk/dependency
/// rules, decision recording) is shared and not overridden.
#[async_trait]
pub trait ContextAwareAgent: BaseAgent {
    /// Project id this agent defaults to when a task carries none.
    fn default_project_id(&self) -> Option<String>;

    /// This agent's strategy catalog, keyed by strategy tag.
    fn strategy_catalog(&self) -> &HashMap<String, DecisionStrategy>;

    /// Pure: choose and/or adjust a strategy given context and recommendations.
    fn select_strategy(
        &self,
        context: Option<&crate::context::ProjectContext>,
        task: &Task,
        recommendations: Option<&RecommendationBundle>,
    ) -> DecisionStrategy;

    /// Impure: do the actual work using the chosen strategy.
    async fn execute_with_strategy(
        &self,
        task: &Task,
        strategy: &DecisionStrategy,
        context: Option<&crate::context::ProjectContext>,
    ) -> Result<TaskResult, AgentError>;

    fn csm(&self) -> &Arc<ContextStateManager>;

    fn decisions(&self) -> &RwLock<Vec<ContextualDecision>>;

    fn current_strategy(&self) -> &RwLock<Option<DecisionStrategy>>;

    /// Estimate `(time_days, resource_demand)` for a strategy/task/context
    /// triple, using the fixed priority-based and pressure-based formula.
    fn estimate_resources(
        &self,
        strategy: &DecisionStrategy,
        task: &Task,
        context: Option<&crate::context::ProjectContext>,
    ) -> (f64, f64) {
        let base_time = base_time_for_priority(task.priority);
        let mut time_estimate = base_time / strategy.speed_factor;
        let mut resource_demand = 0.5 * strategy.resource_intensity;

        if let Some(ctx) = context {
            if ctx.time_pressure_level() == crate::context::TimePressure::Critical {
                time_estimate *= 0.8;
                resource_demand *= 1.2;
            }
        }

        (time_estimate, resource_demand.min(1.0))
    }

    /// Rule-based risk list for the chosen strategy and context.
    fn identify_risks(
        &self,
        strategy: &DecisionStrategy,
        context: Option<&crate::context::ProjectContext>,
    ) -> Vec<String> {
        let mut risks = Vec::new();
        match strategy.strategy_type.as_str() {
            "fast_delivery" => {
                risks.push("Reduced test coverage may introduce bugs".to_string());
                risks.push("Technical debt accumulation".to_string());
                risks.push("Potential performance issues".to_string());
            }
            "high_quality" => {
                risks.push("Extended timeline may miss market window".to_string());
                risks.push("Over-engineering risk".to_string());
                risks.push("Higher resource consumption".to_string());
            }
            _ => {}
        }

        if let Some(ctx) = context {
            if ctx.tech_debt.is_critical() {
                risks.push("High technical debt may slow development".to_string());
            }
            if ctx.time_pressure_level() == crate::context::TimePressure::Critical {
                risks.push("Extreme time pressure may compromise quality".to_string());
            }
        }

        risks
    }

    /// Rule-based dependency list for the chosen strategy and context.
    fn identify_dependencies(
        &self,
        strategy: &DecisionStrategy,
        context: Option<&crate::context::ProjectContext>,
    ) -> Vec<String> {
        let mut dependencies = Vec::new();
        if strategy.strategy_type == "high_quality" {
            dependencies.push("qa-engineer for comprehensive testing".to_string());
            dependencies.push("system-architect for design review".to_string());
        }

        if let Some(ctx) = context {
            if ctx
                .constraints
                .compliance_requirements
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case("security"))
            {
                dependencies.push("security-engineer for compliance review".to_string());
            }
            for expertise in &ctx.constraints.technical_expertise {
                dependencies.push(format!("Expert in {expertise}"));
            }
        }

        dependencies
    }

    /// The core algorithm: resolve context, get recommendations, select a
    /// strategy, estimate, record a `ContextualDecision`, and execute.
    async fn execute_context_aware(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let project_id = task.project_id().or_else(|| self.default_project_id());

        let Some(project_id) = project_id else {
            warn!(agent_id = self.agent_id(), "no project context available");
            return self.execute_without_context(task).await;
        };

        let context = self.csm().get(&project_id).await;
        let Some(context) = context else {
            warn!(project_id, "context not registered, falling back");
            return self.execute_without_context(task).await;
        };

        let recommendations = self
            .csm()
            .recommendations(&project_id, self.agent_id())
            .await
            .ok();

        let strategy = self.select_strategy(Some(&context), task, recommendations.as_ref());
        let (time_estimate, resource_demand) = self.estimate_resources(&strategy, task, Some(&context));
        let risks = self.identify_risks(&strategy, Some(&context));
        let dependencies = self.identify_dependencies(&strategy, Some(&context));

        let decision = ContextualDecision {
            decision_id: format!("{}_{}_{}", self.agent_id(), task.id, Utc::now().timestamp_nanos_opt().unwrap_or_default()),
            agent_id: self.agent_id().to_string(),
            task_id: task.id.clone(),
            strategy: strategy.clone(),
            context_snapshot: Some(context.to_value()),
            estimated_time_days: time_estimate,
            resource_demand,
            dependencies,
            risks,
            created_at: Utc::now(),
        };

        self.decisions().write().await.push(decision.clone());
        *self.current_strategy().write().await = Some(strategy.clone());

        let mut result = self
            .execute_with_strategy(task, &strategy, Some(&context))
            .await?;

        let mut metadata = result.metadata.unwrap_or_default();
        metadata.insert("context_aware".to_string(), Value::Bool(true));
        metadata.insert(
            "strategy_used".to_string(),
            serde_json::to_value(&strategy).unwrap_or(Value::Null),
        );
        metadata.insert("decision_id".to_string(), Value::String(decision.decision_id.clone()));
        result.metadata = Some(metadata);

        Ok(result)
    }

    /// Fallback path when no context can be resolved: use `balanced` and
    /// mark the decision snapshot absent. Work must still complete.
    async fn execute_without_context(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let strategy = DecisionStrategy::balanced();
        *self.current_strategy().write().await = Some(strategy.clone());
        self.execute_with_strategy(task, &strategy, None).await
    }

    async fn get_decision_history(&self) -> Vec<ContextualDecision> {
        self.decisions().read().await.clone()
    }

    async fn get_current_strategy(&self) -> Option<DecisionStrategy> {
        self.current_strategy().read().await.clone()
    }

    async fn explain_current_decision(&self) -> String {
        match self.current_strategy().read().await.as_ref() {
            Some(strategy) => format!(
                "Using {} strategy: {}. Target quality: {:.1}%, Speed factor: {:.1}x",
                strategy.strategy_type,
                strategy.rationale,
                strategy.quality_target * 100.0,
                strategy.speed_factor
            ),
            None => "No active strategy".to_string(),
        }
    }

    async fn get_context_awareness_stats(&self) -> HashMap<String, Value> {
        let decisions = self.decisions().read().await;
        let total = decisions.len();
        let mut stats = HashMap::new();
        stats.insert("total_decisions".to_string(), Value::from(total));

        if total == 0 {
            stats.insert("strategy_distribution".to_string(), Value::Object(Default::default()));
            return stats;
        }

        let mut distribution: HashMap<String, u64> = HashMap::new();
        let mut resource_sum = 0.0;
        let mut time_sum = 0.0;
        for decision in decisions.iter() {
            *distribution.entry(decision.strategy.strategy_type.clone()).or_insert(0) += 1;
            resource_sum += decision.resource_demand;
            time_sum += decision.estimated_time_days;
        }

        stats.insert(
            "strategy_distribution".to_string(),
            serde_json::to_value(distribution).unwrap_or(Value::Null),
        );
        stats.insert(
            "avg_resource_demand".to_string(),
            Value::from(resource_sum / total as f64),
        );
        stats.insert(
            "avg_estimated_time".to_string(),
            Value::from(time_sum / total as f64),
        );
        stats
    }
}
