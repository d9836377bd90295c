//! C7: the task orchestrator — single-shot task execution plus DAG
//! workflows with readiness computation, retries, and per-step timeouts.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::{Task, TaskPriority, TaskResult};
use crate::config::OrchestratorSettings;
use crate::error::OrchestratorError;
use crate::registry::AgentRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// One node in a workflow's dependency DAG, plus its mutable execution
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    pub task_description: String,
    pub required_capabilities: Vec<String>,
    pub input_data: HashMap<String, Value>,
    pub depends_on: Vec<String>,
    pub timeout_minutes: u64,
    pub retry_count: u32,
    pub max_retries: u32,

    pub status: WorkflowStatus,
    pub assigned_agent_id: Option<String>,
    pub result: Option<TaskResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl WorkflowStep {
    fn from_definition(def: WorkflowStepDefinition, default_timeout_minutes: u64) -> Self {
        Self {
            id: def.id,
            name: def.name,
            task_description: def.task_description,
            required_capabilities: def.required_capabilities,
            input_data: def.input_data,
            depends_on: def.depends_on,
            timeout_minutes: def.timeout_minutes.unwrap_or(default_timeout_minutes),
            retry_count: 0,
            max_retries: def.max_retries.unwrap_or(2),
            status: WorkflowStatus::Pending,
            assigned_agent_id: None,
            result: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}

/// A complete DAG of steps plus execution state and collected results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: WorkflowStatus,
    pub results: HashMap<String, HashMap<String, Value>>,
}

impl Workflow {
    /// Steps whose status is pending and whose dependencies are all
    /// completed.
    pub fn get_ready_steps(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|step| step.status == WorkflowStatus::Pending)
            .filter(|step| {
                step.depends_on.iter().all(|dep_id| {
                    self.steps
                        .iter()
                        .any(|s| s.id == *dep_id && s.status == WorkflowStatus::Completed)
                })
            })
            .map(|step| step.id.clone())
            .collect()
    }

    pub fn is_completed(&self) -> bool {
        self.steps
            .iter()
            .all(|step| matches!(step.status, WorkflowStatus::Completed | WorkflowStatus::Failed))
    }

    pub fn has_failed_steps(&self) -> bool {
        self.steps.iter().any(|step| step.status == WorkflowStatus::Failed)
    }

    fn step_mut(&mut self, id: &str) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|step| step.id == id)
    }
}

/// One step as supplied by a caller building a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepDefinition {
    pub id: String,
    pub name: String,
    pub task_description: String,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub input_data: HashMap<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub timeout_minutes: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStepDefinition>,
}

/// Drives one-shot tasks and DAG workflows on top of an `AgentRegistry`.
pub struct TaskOrchestrator {
    registry: Arc<AgentRegistry>,
    workflows: RwLock<HashMap<String, Workflow>>,
    running: AtomicBool,
    settings: OrchestratorSettings,
}

impl TaskOrchestrator {
    pub fn new(registry: Arc<AgentRegistry>, settings: OrchestratorSettings) -> Arc<Self> {
        Arc::new(Self {
            registry,
            workflows: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
            settings,
        })
    }

    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        info!("task orchestrator started");
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.workflow_execution_loop().await })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("task orchestrator stopped");
    }

    /// Run one task immediately, outside of any workflow.
    pub async fn execute_single_task(
        &self,
        task_description: impl Into<String>,
        task_data: HashMap<String, Value>,
        required_capabilities: Vec<String>,
        priority: TaskPriority,
        preferred_agent_id: Option<&str>,
    ) -> TaskResult {
        let description = task_description.into();
        let mut context = HashMap::new();
        context.insert(
            "required_capabilities".to_string(),
            serde_json::to_value(&required_capabilities).unwrap_or(Value::Null),
        );

        let task = Task::new(description.clone(), task_data)
            .with_priority(priority)
            .with_context(context);

        info!(task_description = %description, "executing single task");
        self.registry.execute_task(task, preferred_agent_id).await
    }

    /// Validates the DAG (unique ids, known dependencies, no cycles) and
    /// stores the workflow in `pending` state.
    pub async fn create_workflow(&self, definition: WorkflowDefinition) -> Result<String, OrchestratorError> {
        let workflow_id = Uuid::new_v4().to_string();

        let mut seen = HashSet::new();
        for step in &definition.steps {
            if !seen.insert(step.id.clone()) {
                return Err(OrchestratorError::DuplicateStepId(step.id.clone()));
            }
        }

        let known_ids: HashSet<&str> = definition.steps.iter().map(|s| s.id.as_str()).collect();
        for step in &definition.steps {
            for dep in &step.depends_on {
                if !known_ids.contains(dep.as_str()) {
                    return Err(OrchestratorError::UnknownDependency {
                        step: step.id.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }

        detect_cycle(&definition.steps)?;

        let steps: Vec<WorkflowStep> = definition
            .steps
            .into_iter()
            .map(|def| WorkflowStep::from_definition(def, self.settings.default_step_timeout_minutes))
            .collect();

        let workflow = Workflow {
            id: workflow_id.clone(),
            name: definition.name,
            description: definition.description,
            steps,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            status: WorkflowStatus::Pending,
            results: HashMap::new(),
        };

        info!(workflow_id, name = %workflow.name, "created workflow");
        self.workflows.write().await.insert(workflow_id.clone(), workflow);
        Ok(workflow_id)
    }

    pub async fn start_workflow(&self, workflow_id: &str) -> Result<(), OrchestratorError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;

        if workflow.status != WorkflowStatus::Pending {
            return Err(OrchestratorError::NotPending);
        }

        workflow.status = WorkflowStatus::Running;
        workflow.started_at = Some(Utc::now());
        info!(workflow_id, name = %workflow.name, "started workflow");
        Ok(())
    }

    /// Non-preemptive: steps already dispatched to an agent run to
    /// completion; only steps still pending are prevented from starting.
    pub async fn cancel_workflow(&self, workflow_id: &str) -> bool {
        let mut workflows = self.workflows.write().await;
        let Some(workflow) = workflows.get_mut(workflow_id) else {
            return false;
        };

        workflow.status = WorkflowStatus::Cancelled;
        for step in &mut workflow.steps {
            if step.status == WorkflowStatus::Running {
                step.status = WorkflowStatus::Cancelled;
            }
        }

        info!(workflow_id, "cancelled workflow");
        true
    }

    pub async fn get_workflow_status(&self, workflow_id: &str) -> Option<Workflow> {
        self.workflows.read().await.get(workflow_id).cloned()
    }

    pub async fn get_all_workflows(&self) -> HashMap<String, Workflow> {
        self.workflows.read().await.clone()
    }

    async fn workflow_execution_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.settings.tick_interval_secs));

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;

            let running_ids: Vec<String> = self
                .workflows
                .read()
                .await
                .iter()
                .filter(|(_, wf)| wf.status == WorkflowStatus::Running)
                .map(|(id, _)| id.clone())
                .collect();

            for workflow_id in running_ids {
                if let Err(err) = self.process_workflow(&workflow_id).await {
                    error!(workflow_id, error = %err, "error processing workflow");
                }
            }
        }
    }

    async fn process_workflow(&self, workflow_id: &str) -> Result<(), OrchestratorError> {
        let ready = {
            let workflows = self.workflows.read().await;
            let workflow = workflows
                .get(workflow_id)
                .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;
            workflow.get_ready_steps()
        };

        // Ready steps have no edges between them by construction (an edge
        // would make one depend on the other, excluding it from this set),
        // so they run concurrently rather than one at a time -- capacity is
        // bounded by however many agents the registry can actually hand out.
        let outcomes = join_all(
            ready
                .iter()
                .map(|step_id| self.execute_workflow_step(workflow_id, step_id)),
        )
        .await;
        for outcome in outcomes {
            outcome?;
        }

        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;

        if workflow.is_completed() && workflow.status == WorkflowStatus::Running {
            workflow.status = if workflow.has_failed_steps() {
                WorkflowStatus::Failed
            } else {
                WorkflowStatus::Completed
            };
            workflow.completed_at = Some(Utc::now());

            workflow.results = workflow
                .steps
                .iter()
                .filter(|step| step.status == WorkflowStatus::Completed)
                .map(|step| {
                    let output = step.result.as_ref().map(|r| r.output_data.clone()).unwrap_or_default();
                    (step.id.clone(), output)
                })
                .collect();

            info!(workflow_id, status = ?workflow.status, "workflow completed");
        }

        Ok(())
    }

    /// Builds the step's task (threading in prior steps' outputs),
    /// dispatches it under a per-step timeout, and applies the retry
    /// policy on failure.
    async fn execute_workflow_step(&self, workflow_id: &str, step_id: &str) -> Result<(), OrchestratorError> {
        let (task, timeout_minutes) = {
            let mut workflows = self.workflows.write().await;
            let workflow = workflows
                .get_mut(workflow_id)
                .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;

            let mut input_data = workflow
                .steps
                .iter()
                .find(|s| s.id == step_id)
                .map(|s| s.input_data.clone())
                .unwrap_or_default();

            let depends_on = workflow
                .steps
                .iter()
                .find(|s| s.id == step_id)
                .map(|s| s.depends_on.clone())
                .unwrap_or_default();

            for dep_id in &depends_on {
                if let Some(dep_step) = workflow.steps.iter().find(|s| s.id == *dep_id) {
                    if let Some(result) = &dep_step.result {
                        input_data.insert(
                            format!("step_{dep_id}_result"),
                            serde_json::to_value(&result.output_data).unwrap_or(Value::Null),
                        );
                    }
                }
            }

            let step = workflow.step_mut(step_id).expect("step exists");
            let mut context = HashMap::new();
            context.insert(
                "required_capabilities".to_string(),
                serde_json::to_value(&step.required_capabilities).unwrap_or(Value::Null),
            );

            let task = Task {
                id: format!("{workflow_id}_{step_id}_{}", Uuid::new_v4()),
                description: step.task_description.clone(),
                input_data,
                priority: TaskPriority::Medium,
                created_at: Utc::now(),
                context: Some(context),
            };

            (task, step.timeout_minutes)
        };

        let agent_id = self.registry.find_best_agent_for_task(&task).await;
        let Some(agent_id) = agent_id else {
            let mut workflows = self.workflows.write().await;
            let workflow = workflows.get_mut(workflow_id).expect("workflow exists");
            let step = workflow.step_mut(step_id).expect("step exists");
            step.status = WorkflowStatus::Failed;
            step.error_message = Some("No suitable agent found".to_string());
            step.completed_at = Some(Utc::now());
            warn!(workflow_id, step_id, "no suitable agent found");
            return Ok(());
        };

        {
            let mut workflows = self.workflows.write().await;
            let workflow = workflows.get_mut(workflow_id).expect("workflow exists");
            let step = workflow.step_mut(step_id).expect("step exists");
            step.status = WorkflowStatus::Running;
            step.assigned_agent_id = Some(agent_id.clone());
            step.started_at = Some(Utc::now());
        }

        info!(workflow_id, step_id, agent_id, "executing workflow step");

        let timeout = std::time::Duration::from_secs(timeout_minutes * 60);
        let result = match tokio::time::timeout(timeout, self.registry.execute_task(task.clone(), Some(&agent_id))).await {
            Ok(result) => result,
            Err(_) => TaskResult::failure(task.id.clone(), format!("step timed out after {timeout_minutes} minutes")),
        };

        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(workflow_id).expect("workflow exists");
        let step = workflow.step_mut(step_id).expect("step exists");
        step.completed_at = Some(Utc::now());

        if result.success {
            step.status = WorkflowStatus::Completed;
            step.result = Some(result);
            info!(workflow_id, step_id, "workflow step completed successfully");
        } else if step.retry_count < step.max_retries {
            step.retry_count += 1;
            step.status = WorkflowStatus::Pending;
            step.assigned_agent_id = None;
            step.started_at = None;
            warn!(workflow_id, step_id, retry_count = step.retry_count, max_retries = step.max_retries, "workflow step failed, retrying");
        } else {
            step.status = WorkflowStatus::Failed;
            step.error_message = result.error_message.clone();
            step.result = Some(result);
            error!(workflow_id, step_id, "workflow step failed permanently");
        }

        Ok(())
    }
}

/// Depth-first cycle detection over the `depends_on` edges.
fn detect_cycle(steps: &[WorkflowStepDefinition]) -> Result<(), OrchestratorError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let index: HashMap<&str, usize> = steps.iter().enumerate().map(|(i, s)| (s.id.as_str(), i)).collect();
    let mut marks = vec![Mark::Unvisited; steps.len()];

    fn visit(
        node: usize,
        steps: &[WorkflowStepDefinition],
        index: &HashMap<&str, usize>,
        marks: &mut [Mark],
    ) -> Result<(), OrchestratorError> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::InProgress => return Err(OrchestratorError::CyclicDependency),
            Mark::Unvisited => {}
        }

        marks[node] = Mark::InProgress;
        for dep in &steps[node].depends_on {
            if let Some(&dep_index) = index.get(dep.as_str()) {
                visit(dep_index, steps, index, marks)?;
            }
        }
        marks[node] = Mark::Done;
        Ok(())
    }

    for i in 0..steps.len() {
        visit(i, steps, &index, &mut marks)?;
    }
    Ok(())
}

/// A linear chain: each step depends on the one before it.
pub fn create_linear_workflow(name: impl Into<String>, tasks: Vec<WorkflowTaskSpec>) -> WorkflowDefinition {
    let count = tasks.len();
    let steps = tasks
        .into_iter()
        .enumerate()
        .map(|(i, task)| {
            let step_id = format!("step_{}", i + 1);
            WorkflowStepDefinition {
                id: step_id,
                name: task.name.unwrap_or_else(|| format!("Step {}", i + 1)),
                task_description: task.description,
                required_capabilities: task.capabilities,
                input_data: task.input_data,
                depends_on: if i > 0 { vec![format!("step_{i}")] } else { Vec::new() },
                timeout_minutes: None,
                max_retries: None,
            }
        })
        .collect();

    WorkflowDefinition {
        name: name.into(),
        description: format!("Linear workflow with {count} steps"),
        steps,
    }
}

/// A fan-out: every step is independently ready from the start.
pub fn create_parallel_workflow(name: impl Into<String>, tasks: Vec<WorkflowTaskSpec>) -> WorkflowDefinition {
    let count = tasks.len();
    let steps = tasks
        .into_iter()
        .enumerate()
        .map(|(i, task)| WorkflowStepDefinition {
            id: format!("step_{}", i + 1),
            name: task.name.unwrap_or_else(|| format!("Step {}", i + 1)),
            task_description: task.description,
            required_capabilities: task.capabilities,
            input_data: task.input_data,
            depends_on: Vec::new(),
            timeout_minutes: None,
            max_retries: None,
        })
        .collect();

    WorkflowDefinition {
        name: name.into(),
        description: format!("Parallel workflow with {count} steps"),
        steps,
    }
}

/// Input to the linear/parallel workflow builders.
#[derive(Debug, Clone, Default)]
pub struct WorkflowTaskSpec {
    pub name: Option<String>,
    pub description: String,
    pub capabilities: Vec<String>,
    pub input_data: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentStatus, BaseAgent};
    use crate::config::RegistrySettings;
    use crate::error::AgentError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU8;

    struct EchoAgent {
        id: String,
        caps: Vec<String>,
        status: AtomicU8,
    }

    #[async_trait]
    impl BaseAgent for EchoAgent {
        fn agent_id(&self) -> &str {
            &self.id
        }
        fn agent_type(&self) -> &str {
            "echo"
        }
        fn capabilities(&self) -> &[String] {
            &self.caps
        }
        fn status(&self) -> AgentStatus {
            match self.status.load(Ordering::SeqCst) {
                0 => AgentStatus::Idle,
                1 => AgentStatus::Busy,
                2 => AgentStatus::Error,
                _ => AgentStatus::Offline,
            }
        }
        fn set_status(&self, status: AgentStatus) {
            let v = match status {
                AgentStatus::Idle => 0,
                AgentStatus::Busy => 1,
                AgentStatus::Error => 2,
                AgentStatus::Offline => 3,
            };
            self.status.store(v, Ordering::SeqCst);
        }
        async fn execute(&self, task: &Task) -> Result<TaskResult, AgentError> {
            Ok(TaskResult::ok(task.id.clone(), HashMap::new()))
        }
    }

    fn echo(id: &str) -> Arc<dyn BaseAgent> {
        Arc::new(EchoAgent {
            id: id.to_string(),
            caps: vec!["general".to_string()],
            status: AtomicU8::new(0),
        })
    }

    async fn orchestrator_with_one_agent() -> Arc<TaskOrchestrator> {
        let registry = AgentRegistry::new(RegistrySettings::default());
        registry.register_agent(echo("a1")).await;
        TaskOrchestrator::new(registry, OrchestratorSettings::default())
    }

    #[tokio::test]
    async fn execute_single_task_runs_immediately() {
        let orchestrator = orchestrator_with_one_agent().await;
        let result = orchestrator
            .execute_single_task("say hi", HashMap::new(), vec![], TaskPriority::Medium, None)
            .await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn create_workflow_rejects_duplicate_step_ids() {
        let orchestrator = orchestrator_with_one_agent().await;
        let definition = WorkflowDefinition {
            name: "dup".to_string(),
            description: String::new(),
            steps: vec![
                WorkflowStepDefinition {
                    id: "s1".to_string(),
                    name: "one".to_string(),
                    task_description: "do".to_string(),
                    required_capabilities: vec![],
                    input_data: HashMap::new(),
                    depends_on: vec![],
                    timeout_minutes: None,
                    max_retries: None,
                },
                WorkflowStepDefinition {
                    id: "s1".to_string(),
                    name: "two".to_string(),
                    task_description: "do".to_string(),
                    required_capabilities: vec![],
                    input_data: HashMap::new(),
                    depends_on: vec![],
                    timeout_minutes: None,
                    max_retries: None,
                },
            ],
        };

        let result = orchestrator.create_workflow(definition).await;
        assert!(matches!(result, Err(OrchestratorError::DuplicateStepId(_))));
    }

    #[tokio::test]
    async fn create_workflow_rejects_unknown_dependency() {
        let orchestrator = orchestrator_with_one_agent().await;
        let definition = WorkflowDefinition {
            name: "bad-dep".to_string(),
            description: String::new(),
            steps: vec![WorkflowStepDefinition {
                id: "s1".to_string(),
                name: "one".to_string(),
                task_description: "do".to_string(),
                required_capabilities: vec![],
                input_data: HashMap::new(),
                depends_on: vec!["ghost".to_string()],
                timeout_minutes: None,
                max_retries: None,
            }],
        };

        let result = orchestrator.create_workflow(definition).await;
        assert!(matches!(result, Err(OrchestratorError::UnknownDependency { .. })));
    }

    #[tokio::test]
    async fn create_workflow_rejects_a_cycle() {
        let orchestrator = orchestrator_with_one_agent().await;
        let definition = WorkflowDefinition {
            name: "cyclic".to_string(),
            description: String::new(),
            steps: vec![
                WorkflowStepDefinition {
                    id: "a".to_string(),
                    name: "a".to_string(),
                    task_description: "do".to_string(),
                    required_capabilities: vec![],
                    input_data: HashMap::new(),
                    depends_on: vec!["b".to_string()],
                    timeout_minutes: None,
                    max_retries: None,
                },
                WorkflowStepDefinition {
                    id: "b".to_string(),
                    name: "b".to_string(),
                    task_description: "do".to_string(),
                    required_capabilities: vec![],
                    input_data: HashMap::new(),
                    depends_on: vec!["a".to_string()],
                    timeout_minutes: None,
                    max_retries: None,
                },
            ],
        };

        let result = orchestrator.create_workflow(definition).await;
        assert!(matches!(result, Err(OrchestratorError::CyclicDependency)));
    }

    #[tokio::test]
    async fn start_workflow_requires_pending_state() {
        let orchestrator = orchestrator_with_one_agent().await;
        let id = orchestrator
            .create_workflow(create_linear_workflow(
                "chain",
                vec![WorkflowTaskSpec {
                    description: "only step".to_string(),
                    ..Default::default()
                }],
            ))
            .await
            .unwrap();

        assert!(orchestrator.start_workflow(&id).await.is_ok());
        assert!(matches!(orchestrator.start_workflow(&id).await, Err(OrchestratorError::NotPending)));
    }

    #[tokio::test]
    async fn linear_workflow_executes_steps_in_order_to_completion() {
        let orchestrator = orchestrator_with_one_agent().await;
        let id = orchestrator
            .create_workflow(create_linear_workflow(
                "chain",
                vec![
                    WorkflowTaskSpec {
                        description: "first".to_string(),
                        ..Default::default()
                    },
                    WorkflowTaskSpec {
                        description: "second".to_string(),
                        ..Default::default()
                    },
                ],
            ))
            .await
            .unwrap();

        orchestrator.start_workflow(&id).await.unwrap();

        for _ in 0..2 {
            orchestrator.process_workflow(&id).await.unwrap();
        }

        let workflow = orchestrator.get_workflow_status(&id).await.unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert!(workflow.steps.iter().all(|s| s.status == WorkflowStatus::Completed));
    }

    #[tokio::test]
    async fn cancel_workflow_stops_pending_steps_from_starting() {
        let orchestrator = orchestrator_with_one_agent().await;
        let id = orchestrator
            .create_workflow(create_linear_workflow(
                "chain",
                vec![WorkflowTaskSpec {
                    description: "only".to_string(),
                    ..Default::default()
                }],
            ))
            .await
            .unwrap();
        orchestrator.start_workflow(&id).await.unwrap();

        assert!(orchestrator.cancel_workflow(&id).await);
        let workflow = orchestrator.get_workflow_status(&id).await.unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Cancelled);
    }

    #[tokio::test]
    async fn parallel_workflow_has_no_interdependencies() {
        let definition = create_parallel_workflow(
            "fanout",
            vec![
                WorkflowTaskSpec {
                    description: "a".to_string(),
                    ..Default::default()
                },
                WorkflowTaskSpec {
                    description: "b".to_string(),
                    ..Default::default()
                },
            ],
        );
        assert!(definition.steps.iter().all(|s| s.depends_on.is_empty()));
    }
}
