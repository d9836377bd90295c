//! C6: the agent registry — registration, capability/type indices, and
//! scoring-based best-agent selection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::agent::{AgentStatus, BaseAgent, Task, TaskResult};
use crate::config::RegistrySettings;
use crate::error::RegistryError;
use crate::message::{Message, MessageHandler, MessageRouter, MessageType};

/// Registration-time and runtime metadata tracked per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub agent_type: String,
    pub capabilities: Vec<String>,
    pub status: AgentStatus,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub max_concurrent_tasks: u32,
    pub current_task_count: u32,
    pub total_tasks_completed: u64,
    pub average_execution_time: f64,
    pub error_count: u64,
}

impl AgentInfo {
    fn new(agent_id: String, agent_type: String, capabilities: Vec<String>, status: AgentStatus) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            agent_type,
            capabilities,
            status,
            registered_at: now,
            last_heartbeat: now,
            max_concurrent_tasks: 1,
            current_task_count: 0,
            total_tasks_completed: 0,
            average_execution_time: 0.0,
            error_count: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == AgentStatus::Idle && self.current_task_count < self.max_concurrent_tasks
    }

    pub fn is_healthy(&self, timeout: chrono::Duration) -> bool {
        Utc::now() - self.last_heartbeat < timeout
    }

    /// Rolling average on success; error tally on failure.
    fn update_performance_metrics(&mut self, execution_time: f64, success: bool) {
        if success {
            self.total_tasks_completed += 1;
            if self.average_execution_time == 0.0 {
                self.average_execution_time = execution_time;
            } else {
                let n = self.total_tasks_completed as f64;
                self.average_execution_time =
                    (self.average_execution_time * (n - 1.0) + execution_time) / n;
            }
        } else {
            self.error_count += 1;
        }
    }

    /// `1/(mean_exec_time+1) + 1/(error_rate+0.01) + 1/(load_ratio+0.1)`.
    fn score(&self) -> f64 {
        let error_rate = self.error_count as f64 / self.total_tasks_completed.max(1) as f64;
        let load_ratio = self.current_task_count as f64 / self.max_concurrent_tasks.max(1) as f64;

        1.0 / (self.average_execution_time + 1.0) + 1.0 / (error_rate + 0.01) + 1.0 / (load_ratio + 0.1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_agents: u64,
    pub active_agents: u64,
    pub available_agents: u64,
    pub total_tasks_completed: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub unique_capabilities: u64,
    pub agent_types: u64,
}

/// Central registry of live agents: who exists, what they can do, and how
/// well they're performing.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<dyn BaseAgent>>>,
    agent_info: RwLock<HashMap<String, AgentInfo>>,
    capabilities_index: RwLock<HashMap<String, HashSet<String>>>,
    type_index: RwLock<HashMap<String, HashSet<String>>>,
    pub message_router: MessageRouter,
    running: AtomicBool,
    settings: RegistrySettings,
}

impl AgentRegistry {
    pub fn new(settings: RegistrySettings) -> Arc<Self> {
        Arc::new(Self {
            agents: RwLock::new(HashMap::new()),
            agent_info: RwLock::new(HashMap::new()),
            capabilities_index: RwLock::new(HashMap::new()),
            type_index: RwLock::new(HashMap::new()),
            message_router: MessageRouter::new(),
            running: AtomicBool::new(false),
            settings,
        })
    }

    /// Spawns the background health-check loop. Returns the join handle so
    /// callers can await shutdown.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        info!("agent registry started");
        let registry = self.clone();
        tokio::spawn(async move { registry.health_check_loop().await })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("agent registry stopped");
    }

    /// Initializes the agent, records its metadata, indexes it, and wires
    /// up a heartbeat-updating message handler.
    pub async fn register_agent(self: &Arc<Self>, agent: Arc<dyn BaseAgent>) -> bool {
        agent.initialize().await;

        let info = AgentInfo::new(
            agent.agent_id().to_string(),
            agent.agent_type().to_string(),
            agent.capabilities().to_vec(),
            agent.status(),
        );

        let agent_id = info.agent_id.clone();
        self.update_indices(&info).await;
        self.agents.write().await.insert(agent_id.clone(), agent);
        self.agent_info.write().await.insert(agent_id.clone(), info);

        self.message_router
            .register_handler(
                agent_id.clone(),
                Arc::new(HeartbeatHandler {
                    agent_id: agent_id.clone(),
                    registry: Arc::downgrade(self),
                }),
            )
            .await;

        info!(agent_id, "registered agent");
        true
    }

    pub async fn unregister_agent(&self, agent_id: &str) -> bool {
        let agent = self.agents.write().await.remove(agent_id);
        let Some(agent) = agent else {
            return false;
        };
        agent.shutdown().await;

        if let Some(info) = self.agent_info.write().await.remove(agent_id) {
            self.remove_from_indices(&info).await;
        }
        self.message_router.unregister_handler(agent_id).await;

        info!(agent_id, "unregistered agent");
        true
    }

    pub async fn find_agents_by_capability(&self, capability: &str) -> Vec<String> {
        self.capabilities_index
            .read()
            .await
            .get(capability)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn find_agents_by_type(&self, agent_type: &str) -> Vec<String> {
        self.type_index
            .read()
            .await
            .get(agent_type)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Among available, healthy agents that `can_handle` the task, pick the
    /// highest-scoring one. Ties go to whichever is encountered first.
    pub async fn find_best_agent_for_task(&self, task: &Task) -> Option<String> {
        let agents = self.agents.read().await;
        let agent_info = self.agent_info.read().await;
        let timeout = chrono::Duration::seconds(self.settings.heartbeat_timeout_secs as i64);

        let mut best: Option<(String, f64)> = None;
        for (agent_id, info) in agent_info.iter() {
            if !info.is_available() || !info.is_healthy(timeout) {
                continue;
            }
            let Some(agent) = agents.get(agent_id) else {
                continue;
            };
            if !agent.can_handle(task) {
                continue;
            }

            let score = info.score();
            if best.as_ref().map(|(_, best_score)| score > *best_score).unwrap_or(true) {
                best = Some((agent_id.clone(), score));
            }
        }

        best.map(|(agent_id, _)| agent_id)
    }

    pub async fn get_agent_info(&self, agent_id: &str) -> Option<AgentInfo> {
        self.agent_info.read().await.get(agent_id).cloned()
    }

    pub async fn get_all_agents(&self) -> HashMap<String, AgentInfo> {
        self.agent_info.read().await.clone()
    }

    pub async fn system_stats(&self) -> RegistryStats {
        let agent_info = self.agent_info.read().await;
        let total_agents = agent_info.len() as u64;
        let active_agents = agent_info
            .values()
            .filter(|info| !matches!(info.status, AgentStatus::Offline | AgentStatus::Error))
            .count() as u64;
        let available_agents = agent_info.values().filter(|info| info.is_available()).count() as u64;
        let total_tasks_completed: u64 = agent_info.values().map(|info| info.total_tasks_completed).sum();
        let total_errors: u64 = agent_info.values().map(|info| info.error_count).sum();

        RegistryStats {
            total_agents,
            active_agents,
            available_agents,
            total_tasks_completed,
            total_errors,
            error_rate: total_errors as f64 / total_tasks_completed.max(1) as f64,
            unique_capabilities: self.capabilities_index.read().await.len() as u64,
            agent_types: self.type_index.read().await.len() as u64,
        }
    }

    /// Routes a task to `preferred_agent_id` if it is available, else to
    /// the best-scoring candidate. Guarantees `current_task_count` is
    /// released even on execution failure.
    pub async fn execute_task(&self, task: Task, preferred_agent_id: Option<&str>) -> TaskResult {
        let mut agent_id = None;
        if let Some(preferred) = preferred_agent_id {
            let available = self
                .agent_info
                .read()
                .await
                .get(preferred)
                .map(|info| info.is_available())
                .unwrap_or(false);
            if available {
                agent_id = Some(preferred.to_string());
            }
        }

        if agent_id.is_none() {
            agent_id = self.find_best_agent_for_task(&task).await;
        }

        let Some(agent_id) = agent_id else {
            warn!(task_id = %task.id, "no available agent found for task");
            return TaskResult::failure(task.id.clone(), RegistryError::NoAvailableAgent.to_string());
        };

        let agent = {
            let agents = self.agents.read().await;
            match agents.get(&agent_id) {
                Some(agent) => agent.clone(),
                None => return TaskResult::failure(task.id.clone(), RegistryError::AgentNotFound(agent_id).to_string()),
            }
        };

        if let Some(info) = self.agent_info.write().await.get_mut(&agent_id) {
            info.current_task_count += 1;
        }

        let result = agent.execute_with_lifecycle(&task).await;

        if let Some(info) = self.agent_info.write().await.get_mut(&agent_id) {
            info.current_task_count = info.current_task_count.saturating_sub(1);
            info.update_performance_metrics(result.execution_time.unwrap_or(0.0), result.success);
        }

        result
    }

    async fn update_indices(&self, info: &AgentInfo) {
        let mut capabilities_index = self.capabilities_index.write().await;
        for capability in &info.capabilities {
            capabilities_index
                .entry(capability.clone())
                .or_default()
                .insert(info.agent_id.clone());
        }

        let mut type_index = self.type_index.write().await;
        type_index.entry(info.agent_type.clone()).or_default().insert(info.agent_id.clone());
    }

    async fn remove_from_indices(&self, info: &AgentInfo) {
        let mut capabilities_index = self.capabilities_index.write().await;
        for capability in &info.capabilities {
            if let Some(agents) = capabilities_index.get_mut(capability) {
                agents.remove(&info.agent_id);
                if agents.is_empty() {
                    capabilities_index.remove(capability);
                }
            }
        }

        let mut type_index = self.type_index.write().await;
        if let Some(agents) = type_index.get_mut(&info.agent_type) {
            agents.remove(&info.agent_id);
            if agents.is_empty() {
                type_index.remove(&info.agent_type);
            }
        }
    }

    async fn health_check_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.settings.health_check_interval_secs));
        let timeout = chrono::Duration::seconds(self.settings.heartbeat_timeout_secs as i64);

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;

            let unhealthy: Vec<String> = self
                .agent_info
                .read()
                .await
                .iter()
                .filter(|(_, info)| !info.is_healthy(timeout))
                .map(|(id, _)| id.clone())
                .collect();

            let mut agent_info = self.agent_info.write().await;
            for agent_id in unhealthy {
                warn!(agent_id, "agent appears unhealthy");
                if let Some(info) = agent_info.get_mut(&agent_id) {
                    info.status = AgentStatus::Error;
                }
            }
        }
    }
}

/// Updates `last_heartbeat` on receipt of a heartbeat message; otherwise a
/// no-op. Holds the registry weakly since the registry owns the router
/// that owns this handler.
struct HeartbeatHandler {
    agent_id: String,
    registry: Weak<AgentRegistry>,
}

#[async_trait]
impl MessageHandler for HeartbeatHandler {
    async fn handle(&self, message: Message) -> Result<(), crate::error::MessageError> {
        if message.message_type != MessageType::Heartbeat {
            return Ok(());
        }
        if let Some(registry) = self.registry.upgrade() {
            if let Some(info) = registry.agent_info.write().await.get_mut(&self.agent_id) {
                info.last_heartbeat = Utc::now();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::AtomicU8;
    use serde_json::Value;

    struct StubAgent {
        id: String,
        kind: String,
        caps: Vec<String>,
        status: AtomicU8,
        fail: bool,
    }

    fn status_from_u8(v: u8) -> AgentStatus {
        match v {
            0 => AgentStatus::Idle,
            1 => AgentStatus::Busy,
            2 => AgentStatus::Error,
            _ => AgentStatus::Offline,
        }
    }

    fn status_to_u8(status: AgentStatus) -> u8 {
        match status {
            AgentStatus::Idle => 0,
            AgentStatus::Busy => 1,
            AgentStatus::Error => 2,
            AgentStatus::Offline => 3,
        }
    }

    #[async_trait]
    impl BaseAgent for StubAgent {
        fn agent_id(&self) -> &str {
            &self.id
        }

        fn agent_type(&self) -> &str {
            &self.kind
        }

        fn capabilities(&self) -> &[String] {
            &self.caps
        }

        fn status(&self) -> AgentStatus {
            status_from_u8(self.status.load(Ordering::SeqCst))
        }

        fn set_status(&self, status: AgentStatus) {
            self.status.store(status_to_u8(status), Ordering::SeqCst);
        }

        async fn execute(&self, task: &Task) -> Result<TaskResult, AgentError> {
            if self.fail {
                Err(AgentError::ExecutionFailed("boom".to_string()))
            } else {
                Ok(TaskResult::ok(task.id.clone(), StdHashMap::new()))
            }
        }
    }

    fn stub(id: &str, caps: &[&str]) -> Arc<dyn BaseAgent> {
        Arc::new(StubAgent {
            id: id.to_string(),
            kind: "stub".to_string(),
            caps: caps.iter().map(|s| s.to_string()).collect(),
            status: AtomicU8::new(0),
            fail: false,
        })
    }

    #[tokio::test]
    async fn register_then_find_by_capability() {
        let registry = AgentRegistry::new(RegistrySettings::default());
        registry.register_agent(stub("a1", &["coding"])).await;

        let found = registry.find_agents_by_capability("coding").await;
        assert_eq!(found, vec!["a1".to_string()]);
    }

    #[tokio::test]
    async fn unregister_clears_indices() {
        let registry = AgentRegistry::new(RegistrySettings::default());
        registry.register_agent(stub("a1", &["coding"])).await;
        assert!(registry.unregister_agent("a1").await);
        assert!(registry.find_agents_by_capability("coding").await.is_empty());
        assert!(!registry.unregister_agent("a1").await);
    }

    #[tokio::test]
    async fn best_agent_prefers_less_loaded_and_more_reliable() {
        let registry = AgentRegistry::new(RegistrySettings::default());
        registry.register_agent(stub("fast", &["coding"])).await;
        registry.register_agent(stub("slow", &["coding"])).await;

        {
            let mut info = registry.agent_info.write().await;
            info.get_mut("slow").unwrap().current_task_count = 0;
            info.get_mut("slow").unwrap().average_execution_time = 10.0;
            info.get_mut("fast").unwrap().average_execution_time = 0.1;
        }

        let task = Task::new("do it", StdHashMap::new())
            .with_context(StdHashMap::from([(
                "required_capabilities".to_string(),
                Value::Array(vec![Value::String("coding".to_string())]),
            )]));

        let best = registry.find_best_agent_for_task(&task).await;
        assert_eq!(best, Some("fast".to_string()));
    }

    #[tokio::test]
    async fn execute_task_releases_slot_on_failure() {
        let registry = AgentRegistry::new(RegistrySettings::default());
        let agent = Arc::new(StubAgent {
            id: "flaky".to_string(),
            kind: "stub".to_string(),
            caps: vec!["coding".to_string()],
            status: AtomicU8::new(0),
            fail: true,
        });
        registry.register_agent(agent).await;

        let task = Task::new("do it", StdHashMap::new());
        let result = registry.execute_task(task, Some("flaky")).await;
        assert!(!result.success);

        let info = registry.get_agent_info("flaky").await.unwrap();
        assert_eq!(info.current_task_count, 0);
        assert_eq!(info.error_count, 1);
    }

    #[tokio::test]
    async fn execute_task_with_no_available_agent_fails_cleanly() {
        let registry = AgentRegistry::new(RegistrySettings::default());
        let task = Task::new("do it", StdHashMap::new());
        let result = registry.execute_task(task, None).await;
        assert!(!result.success);
    }
}
