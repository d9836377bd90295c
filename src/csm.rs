//! C3: the Context State Manager — the coordination hub. Serves cached
//! reads, absorbs writes atomically, fans events out to subscribers, and
//! answers contextual questions (recommendations, conflict detection).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::authority::{DecisionAuthorityMatrix, RaciRole};
use crate::config::CsmSettings;
use crate::context::{ContextFieldUpdates, ProjectContext, TimePressure};
use crate::error::{AuthorityError, CsmError};

/// A callback notified of context lifecycle events. Stored weakly by the
/// CSM: it must never extend a subscriber's lifetime.
#[async_trait]
pub trait ContextSubscriber: Send + Sync {
    async fn on_context_event(&self, event: ContextEvent);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextEventKind {
    Registered,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEvent {
    pub project_id: String,
    pub event_type: ContextEventKind,
    pub field_updates_summary: Vec<String>,
    pub new_version: u64,
}

/// Opaque handle returned by `subscribe`, used for `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct CacheEntry {
    snapshot: ProjectContext,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConstraints {
    pub min_test_coverage: f64,
    pub code_quality_threshold: f64,
    pub performance_requirements: String,
    pub security_requirements: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConstraints {
    pub timeline: String,
    pub team_capacity: String,
    pub budget_remaining: f64,
    pub technical_expertise: Vec<String>,
    pub time_pressure: TimePressure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedStrategy {
    pub strategy_type: String,
    pub rationale: String,
}

/// Output of the recommendations algorithm: everything an agent needs to
/// pick and parameterize a strategy, derived purely from current context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationBundle {
    pub project_phase: crate::context::LifecyclePhase,
    pub dominant_priority: String,
    pub time_pressure: TimePressure,
    pub suggested_strategy: SuggestedStrategy,
    pub quality_constraints: QualityConstraints,
    pub resource_constraints: ResourceConstraints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictDescriptor {
    pub conflict_type: String,
    pub severity: ConflictSeverity,
    pub description: String,
    pub affected_agents: Vec<String>,
}

/// One agent's proposed decision, as submitted for conflict evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionProposal {
    pub agent_id: String,
    pub estimated_time_days: f64,
    pub resource_demand: f64,
    pub quality_target: Option<f64>,
}

/// Non-blocking counters snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsmStatus {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub total_updates: u64,
    pub active_contexts: u64,
    pub cached_contexts: u64,
    pub subscriber_count: u64,
}

struct Counters {
    total_queries: AtomicU64,
    cache_hits: AtomicU64,
    total_updates: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            total_queries: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            total_updates: AtomicU64::new(0),
        }
    }
}

/// Process-wide store of project contexts. See module docs for the
/// concurrency discipline (single coarse write lock, TTL cache, async
/// event fan-out off the critical section).
pub struct ContextStateManager {
    contexts: RwLock<HashMap<String, ProjectContext>>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    subscribers: RwLock<HashMap<SubscriptionId, Weak<dyn ContextSubscriber>>>,
    next_subscription_id: AtomicU64,
    authority: DecisionAuthorityMatrix,
    counters: Counters,
    settings: CsmSettings,
}

impl ContextStateManager {
    pub fn new(settings: CsmSettings) -> Arc<Self> {
        Arc::new(Self {
            contexts: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
            authority: DecisionAuthorityMatrix::new(),
            counters: Counters::new(),
            settings,
        })
    }

    /// Register a context, overwriting any existing one with the same id.
    /// Re-registration is idempotent: the new value is fully observable and
    /// nothing leaks from a prior registration.
    pub async fn register(self: &Arc<Self>, ctx: ProjectContext) {
        let project_id = ctx.project_id.clone();
        let version = ctx.version;
        {
            let mut contexts = self.contexts.write().await;
            let mut cache = self.cache.write().await;
            contexts.insert(project_id.clone(), ctx);
            cache.remove(&project_id);
        }

        self.dispatch(ContextEvent {
            project_id,
            event_type: ContextEventKind::Registered,
            field_updates_summary: Vec::new(),
            new_version: version,
        })
        .await;
    }

    /// Cache-first read. Returns `None` if the project was never registered.
    pub async fn get(self: &Arc<Self>, project_id: &str) -> Option<ProjectContext> {
        self.counters.total_queries.fetch_add(1, Ordering::Relaxed);

        let ttl = chrono::Duration::seconds(self.settings.cache_ttl_secs as i64);
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(project_id) {
                if Utc::now() - entry.cached_at < ttl {
                    self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.snapshot.clone());
                }
            }
        }

        let contexts = self.contexts.read().await;
        let snapshot = contexts.get(project_id)?.clone();
        drop(contexts);

        let mut cache = self.cache.write().await;
        cache.insert(
            project_id.to_string(),
            CacheEntry {
                snapshot: snapshot.clone(),
                cached_at: Utc::now(),
            },
        );

        Some(snapshot)
    }

    /// Atomic update: validate -> apply -> commit -> invalidate cache ->
    /// bump version (inside `apply_updates`) -> release lock -> dispatch.
    /// Dispatch must never happen before the cache slot is invalidated, or a
    /// subscriber-triggered read could re-populate the cache with a stale
    /// snapshot.
    pub async fn update(
        self: &Arc<Self>,
        project_id: &str,
        updates: &ContextFieldUpdates,
        updated_by: impl Into<String>,
    ) -> Result<u64, CsmError> {
        let updated_by = updated_by.into();
        let new_version;
        {
            let mut contexts = self.contexts.write().await;
            let ctx = contexts
                .get_mut(project_id)
                .ok_or_else(|| CsmError::ContextNotFound(project_id.to_string()))?;

            ctx.apply_updates(updates, updated_by)?;
            new_version = ctx.version;

            let mut cache = self.cache.write().await;
            cache.remove(project_id);
        }

        self.counters.total_updates.fetch_add(1, Ordering::Relaxed);

        self.dispatch(ContextEvent {
            project_id: project_id.to_string(),
            event_type: ContextEventKind::Updated,
            field_updates_summary: summarize(updates),
            new_version,
        })
        .await;

        Ok(new_version)
    }

    pub fn decision_authority(&self, kind: &str) -> Result<RaciRole, AuthorityError> {
        self.authority.decision_authority(kind).map(|role| role.clone())
    }

    /// Derived purely from current context; side-effect free.
    pub async fn recommendations(
        self: &Arc<Self>,
        project_id: &str,
        agent_id: &str,
    ) -> Result<RecommendationBundle, CsmError> {
        let ctx = self
            .get(project_id)
            .await
            .ok_or_else(|| CsmError::ContextNotFound(project_id.to_string()))?;

        let dominant_priority = ctx.dominant_priority().to_string();
        let time_pressure = ctx.time_pressure_level();
        let suggested_strategy = suggest_strategy(&dominant_priority, agent_id);

        let mut quality_constraints = QualityConstraints {
            min_test_coverage: 0.6,
            code_quality_threshold: 7.0,
            performance_requirements: "basic".to_string(),
            security_requirements: "standard".to_string(),
        };

        if ctx.is_quality_prioritized() {
            quality_constraints.min_test_coverage = 0.9;
            quality_constraints.code_quality_threshold = 8.5;
            quality_constraints.performance_requirements = "high".to_string();
        } else if ctx.is_speed_prioritized() {
            quality_constraints.min_test_coverage = 0.5;
            quality_constraints.code_quality_threshold = 6.0;
            quality_constraints.performance_requirements = "acceptable".to_string();
        }

        if !ctx.constraints.compliance_requirements.is_empty() {
            quality_constraints.min_test_coverage = quality_constraints.min_test_coverage.max(0.8);
            quality_constraints.security_requirements = "strict".to_string();
        }

        let resource_constraints = ResourceConstraints {
            timeline: ctx.constraints.timeline.clone(),
            team_capacity: ctx.constraints.team_capacity.clone(),
            budget_remaining: ctx.budget_remaining,
            technical_expertise: ctx.constraints.technical_expertise.clone(),
            time_pressure,
        };

        Ok(RecommendationBundle {
            project_phase: ctx.lifecycle_phase,
            dominant_priority,
            time_pressure,
            suggested_strategy,
            quality_constraints,
            resource_constraints,
        })
    }

    /// Evaluate a set of candidate decisions for cross-agent conflicts.
    /// Pure function over its inputs; does not deduplicate across calls.
    pub async fn detect_conflicts(
        self: &Arc<Self>,
        project_id: &str,
        proposals: &[DecisionProposal],
    ) -> Result<Vec<ConflictDescriptor>, CsmError> {
        let ctx = self
            .get(project_id)
            .await
            .ok_or_else(|| CsmError::ContextNotFound(project_id.to_string()))?;

        let mut conflicts = Vec::new();
        let affected_agents: Vec<String> = proposals.iter().map(|p| p.agent_id.clone()).collect();

        let resource_sum: f64 = proposals.iter().map(|p| p.resource_demand).sum();
        if resource_sum > 1.0 {
            conflicts.push(ConflictDescriptor {
                conflict_type: "resource_conflict".to_string(),
                severity: ConflictSeverity::High,
                description: format!(
                    "Resource demand over-allocated by {:.2} (total {:.2})",
                    resource_sum - 1.0,
                    resource_sum
                ),
                affected_agents: affected_agents.clone(),
            });
        }

        let days_to_deadline = (ctx.deadline - Utc::now()).num_seconds() as f64 / 86_400.0;
        let time_sum: f64 = proposals.iter().map(|p| p.estimated_time_days).sum();
        if time_sum > days_to_deadline {
            conflicts.push(ConflictDescriptor {
                conflict_type: "time_overlap".to_string(),
                severity: ConflictSeverity::Critical,
                description: format!(
                    "Combined estimate {:.1} days exceeds {:.1} days to deadline",
                    time_sum, days_to_deadline
                ),
                affected_agents: affected_agents.clone(),
            });
        }

        let quality_targets: Vec<f64> = proposals.iter().filter_map(|p| p.quality_target).collect();
        if quality_targets.len() >= 2 {
            let max = quality_targets.iter().cloned().fold(f64::MIN, f64::max);
            let min = quality_targets.iter().cloned().fold(f64::MAX, f64::min);
            if max - min > 0.3 {
                conflicts.push(ConflictDescriptor {
                    conflict_type: "quality_standard_mismatch".to_string(),
                    severity: ConflictSeverity::Medium,
                    description: format!("Quality targets span {:.2} to {:.2}", min, max),
                    affected_agents,
                });
            }
        }

        Ok(conflicts)
    }

    /// Register a weakly-held subscriber; silently dropped on dispatch once
    /// the subscriber itself is gone.
    pub async fn subscribe(&self, subscriber: Weak<dyn ContextSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().await.insert(id, subscriber);
        id
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.write().await.remove(&id);
    }

    /// Non-blocking counters snapshot.
    pub async fn status(&self) -> CsmStatus {
        let active_contexts = self.contexts.read().await.len() as u64;
        let cached_contexts = self.cache.read().await.len() as u64;
        let subscriber_count = self.subscribers.read().await.len() as u64;

        CsmStatus {
            total_queries: self.counters.total_queries.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            total_updates: self.counters.total_updates.load(Ordering::Relaxed),
            active_contexts,
            cached_contexts,
            subscriber_count,
        }
    }

    /// Dispatch an event off the critical section: ordered per subscriber
    /// w.r.t. commit order, independent across subscribers. A failing or
    /// dead subscriber is logged/dropped without affecting the commit.
    async fn dispatch(&self, event: ContextEvent) {
        let subscribers: Vec<Weak<dyn ContextSubscriber>> =
            self.subscribers.read().await.values().cloned().collect();

        for weak in subscribers {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_context_event(event.clone()).await;
            }
        }
    }

    /// Background sweeper: drops cache entries past TTL. Must not block
    /// reads — uses its own lock acquisition, independent of `get`.
    pub async fn run_cache_sweeper(self: Arc<Self>) {
        let ttl = chrono::Duration::seconds(self.settings.cache_ttl_secs as i64);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            self.settings.cache_sweep_interval_secs,
        ));
        loop {
            interval.tick().await;
            let now = Utc::now();
            let mut cache = self.cache.write().await;
            let before = cache.len();
            cache.retain(|_, entry| now - entry.cached_at < ttl);
            if cache.len() != before {
                debug!(swept = before - cache.len(), "cache sweeper removed expired entries");
            }
        }
    }

    /// Background task warning about contexts idle for too long and
    /// logging the cache hit rate.
    pub async fn run_idle_context_monitor(self: Arc<Self>) {
        let warn_after = chrono::Duration::hours(self.settings.idle_context_warn_hours as i64);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            self.settings.cache_sweep_interval_secs,
        ));
        loop {
            interval.tick().await;
            let status = self.status().await;
            let hit_rate = if status.total_queries > 0 {
                status.cache_hits as f64 / status.total_queries as f64
            } else {
                0.0
            };
            info!(hit_rate, "csm cache hit rate");

            let now = Utc::now();
            let contexts = self.contexts.read().await;
            for ctx in contexts.values() {
                if now - ctx.last_updated > warn_after {
                    warn!(project_id = %ctx.project_id, "context idle beyond warning threshold");
                }
            }
        }
    }
}

fn summarize(updates: &ContextFieldUpdates) -> Vec<String> {
    let mut fields = Vec::new();
    if updates.project_name.is_some() {
        fields.push("project_name".to_string());
    }
    if updates.lifecycle_phase.is_some() {
        fields.push("lifecycle_phase".to_string());
    }
    if updates.deadline.is_some() {
        fields.push("deadline".to_string());
    }
    if updates.budget_remaining.is_some() {
        fields.push("budget_remaining".to_string());
    }
    if updates.priority_matrix.is_some() {
        fields.push("priority_matrix".to_string());
    }
    if updates.tech_debt_current_level.is_some() {
        fields.push("tech_debt.current_level".to_string());
    }
    fields
}

/// Table-driven mapping: dominant priority x agent category -> (strategy,
/// rationale). Agent category is inferred by substring match on agent id.
fn suggest_strategy(dominant_priority: &str, agent_id: &str) -> SuggestedStrategy {
    let category = if agent_id.starts_with("qa-") || agent_id.contains("qa-") {
        "qa"
    } else if agent_id.contains("system-architect") {
        "architect"
    } else if agent_id.contains("developer") || agent_id.contains("engineer") {
        "engineer"
    } else {
        "generalist"
    };

    let (strategy_type, rationale) = match (dominant_priority, category) {
        ("speed", "qa") => (
            "essential_testing",
            "Speed-dominant project: focus QA effort on the essential test surface",
        ),
        ("speed", _) => (
            "fast_delivery",
            "Speed-dominant project: optimize for delivery velocity",
        ),
        ("quality", "qa") => (
            "comprehensive_testing",
            "Quality-dominant project: maximize test coverage and rigor",
        ),
        ("quality", _) => (
            "high_quality",
            "Quality-dominant project: optimize for correctness and maintainability",
        ),
        ("cost", _) => (
            "cost_conscious",
            "Cost-dominant project: minimize resource consumption",
        ),
        _ => ("balanced", "No single priority dominates: balance speed, quality, and cost"),
    };

    SuggestedStrategy {
        strategy_type: strategy_type.to_string(),
        rationale: rationale.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::create_mvp_context;
    use std::sync::Mutex;

    fn csm() -> Arc<ContextStateManager> {
        ContextStateManager::new(CsmSettings::default())
    }

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let manager = csm();
        let ctx = create_mvp_context("proj-a", 14);
        manager.register(ctx.clone()).await;

        let fetched = manager.get("proj-a").await.unwrap();
        assert_eq!(fetched.project_id, ctx.project_id);
        assert_eq!(fetched.version, ctx.version);
    }

    #[tokio::test]
    async fn get_on_unknown_project_is_none() {
        let manager = csm();
        assert!(manager.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn reregistering_replaces_state_without_leaks() {
        let manager = csm();
        let ctx_a = create_mvp_context("proj-a", 14);
        manager.register(ctx_a).await;

        let mut ctx_b = create_mvp_context("proj-a", 30);
        ctx_b.project_name = "replaced".to_string();
        manager.register(ctx_b).await;

        let fetched = manager.get("proj-a").await.unwrap();
        assert_eq!(fetched.project_name, "replaced");
    }

    #[tokio::test]
    async fn update_strictly_increases_version() {
        let manager = csm();
        manager.register(create_mvp_context("proj-a", 14)).await;
        let before = manager.get("proj-a").await.unwrap().version;

        let new_version = manager
            .update("proj-a", &ContextFieldUpdates::default(), "tester")
            .await
            .unwrap();

        assert!(new_version > before);
    }

    #[tokio::test]
    async fn update_invalidates_cache_before_dispatch() {
        let manager = csm();
        manager.register(create_mvp_context("proj-a", 14)).await;
        // warm the cache
        manager.get("proj-a").await;

        let new_version = manager
            .update(
                "proj-a",
                &ContextFieldUpdates {
                    budget_remaining: Some(0.1),
                    ..Default::default()
                },
                "tester",
            )
            .await
            .unwrap();

        let fetched = manager.get("proj-a").await.unwrap();
        assert_eq!(fetched.version, new_version);
        assert_eq!(fetched.budget_remaining, 0.1);
    }

    #[tokio::test]
    async fn update_on_unknown_project_fails() {
        let manager = csm();
        let result = manager
            .update("missing", &ContextFieldUpdates::default(), "tester")
            .await;
        assert!(matches!(result, Err(CsmError::ContextNotFound(_))));
    }

    #[tokio::test]
    async fn recommendations_tighten_under_quality_and_compliance() {
        let manager = csm();
        let mut ctx = create_mvp_context("proj-b", 14);
        ctx.priority_matrix = crate::context::PriorityMatrix::new(0.1, 0.7, 0.2).unwrap();
        ctx.constraints.compliance_requirements = vec!["SOX".to_string(), "PCI-DSS".to_string()];
        manager.register(ctx).await;

        let bundle = manager.recommendations("proj-b", "qa-engineer-1").await.unwrap();
        assert!(bundle.quality_constraints.min_test_coverage >= 0.8);
        assert_eq!(bundle.quality_constraints.performance_requirements, "high");
        assert_eq!(bundle.quality_constraints.security_requirements, "strict");
    }

    #[tokio::test]
    async fn conflict_detection_flags_overallocation_and_timeline() {
        let manager = csm();
        let mut ctx = create_mvp_context("proj-c", 365);
        ctx.deadline = Utc::now() + chrono::Duration::days(5);
        manager.register(ctx).await;

        let proposals = vec![
            DecisionProposal {
                agent_id: "a1".to_string(),
                estimated_time_days: 3.0,
                resource_demand: 0.4,
                quality_target: None,
            },
            DecisionProposal {
                agent_id: "a2".to_string(),
                estimated_time_days: 3.0,
                resource_demand: 0.5,
                quality_target: None,
            },
            DecisionProposal {
                agent_id: "a3".to_string(),
                estimated_time_days: 3.0,
                resource_demand: 0.3,
                quality_target: None,
            },
        ];

        let conflicts = manager.detect_conflicts("proj-c", &proposals).await.unwrap();
        assert!(conflicts.iter().any(|c| c.conflict_type == "resource_conflict"));
        assert!(conflicts.iter().any(|c| c.conflict_type == "time_overlap"));
    }

    #[tokio::test]
    async fn quality_mismatch_requires_at_least_two_targets() {
        let manager = csm();
        manager.register(create_mvp_context("proj-d", 30)).await;

        let single = vec![DecisionProposal {
            agent_id: "a1".to_string(),
            estimated_time_days: 1.0,
            resource_demand: 0.1,
            quality_target: Some(0.9),
        }];
        let conflicts = manager.detect_conflicts("proj-d", &single).await.unwrap();
        assert!(!conflicts.iter().any(|c| c.conflict_type == "quality_standard_mismatch"));

        let pair = vec![
            DecisionProposal {
                agent_id: "a1".to_string(),
                estimated_time_days: 1.0,
                resource_demand: 0.1,
                quality_target: Some(0.9),
            },
            DecisionProposal {
                agent_id: "a2".to_string(),
                estimated_time_days: 1.0,
                resource_demand: 0.1,
                quality_target: Some(0.5),
            },
        ];
        let conflicts = manager.detect_conflicts("proj-d", &pair).await.unwrap();
        assert!(conflicts.iter().any(|c| c.conflict_type == "quality_standard_mismatch"));
    }

    struct RecordingSubscriber {
        events: Mutex<Vec<ContextEvent>>,
    }

    #[async_trait]
    impl ContextSubscriber for RecordingSubscriber {
        async fn on_context_event(&self, event: ContextEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn subscribers_are_notified_in_commit_order() {
        let manager = csm();
        let subscriber = Arc::new(RecordingSubscriber {
            events: Mutex::new(Vec::new()),
        });
        manager.subscribe(Arc::downgrade(&subscriber) as Weak<dyn ContextSubscriber>).await;

        manager.register(create_mvp_context("proj-e", 14)).await;
        manager
            .update("proj-e", &ContextFieldUpdates::default(), "tester")
            .await
            .unwrap();
        manager
            .update("proj-e", &ContextFieldUpdates::default(), "tester")
            .await
            .unwrap();

        let events = subscriber.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, ContextEventKind::Registered);
        assert_eq!(events[1].new_version, 2);
        assert_eq!(events[2].new_version, 3);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_silently_skipped() {
        let manager = csm();
        {
            let subscriber = Arc::new(RecordingSubscriber {
                events: Mutex::new(Vec::new()),
            });
            manager.subscribe(Arc::downgrade(&subscriber) as Weak<dyn ContextSubscriber>).await;
        }
        // subscriber is now dropped; dispatch must not panic or error.
        manager.register(create_mvp_context("proj-f", 14)).await;
        let status = manager.status().await;
        assert_eq!(status.active_contexts, 1);
    }
}
