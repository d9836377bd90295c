//! C1: the `ProjectContext` model — a typed, validated description of a
//! project's current state, plus the derived queries agents use to pick
//! strategies.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ContextError;

/// Where a project sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Discovery,
    Mvp,
    Production,
    Maintenance,
}

/// Bucketed distance to a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePressure {
    Critical,
    High,
    Medium,
    Low,
}

/// The three-way tradeoff every decision is weighed against.
///
/// Invariant: `speed + quality + cost == 1.0` within `0.01`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityMatrix {
    pub speed: f64,
    pub quality: f64,
    pub cost: f64,
}

const PRIORITY_SUM_TOLERANCE: f64 = 0.01;

impl PriorityMatrix {
    pub fn new(speed: f64, quality: f64, cost: f64) -> Result<Self, ContextError> {
        let matrix = Self {
            speed,
            quality,
            cost,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    fn validate(&self) -> Result<(), ContextError> {
        for (field, value) in [
            ("speed", self.speed),
            ("quality", self.quality),
            ("cost", self.cost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ContextError::OutOfRange { field, value });
            }
        }
        let sum = self.speed + self.quality + self.cost;
        if (sum - 1.0).abs() > PRIORITY_SUM_TOLERANCE {
            return Err(ContextError::PriorityMatrixInvalid(sum));
        }
        Ok(())
    }

    /// Argmax of the three weights, ties broken speed -> quality -> cost.
    pub fn dominant_priority(&self) -> &'static str {
        let mut best = ("speed", self.speed);
        if self.quality > best.1 {
            best = ("quality", self.quality);
        }
        if self.cost > best.1 {
            best = ("cost", self.cost);
        }
        best.0
    }

    /// Independent majority check, distinct from `dominant_priority`: a
    /// context can be speed-dominant without being "speed prioritized" by
    /// this >0.5 threshold, and vice versa is not possible but the two
    /// concepts must not be collapsed into one.
    pub fn is_speed_prioritized(&self) -> bool {
        self.speed > 0.5
    }

    pub fn is_quality_prioritized(&self) -> bool {
        self.quality > 0.5
    }

    pub fn is_cost_prioritized(&self) -> bool {
        self.cost > 0.5
    }
}

/// Constraints the project operates under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConstraints {
    pub timeline: String,
    pub team_capacity: String,
    pub technical_expertise: Vec<String>,
    pub compliance_requirements: Vec<String>,
    pub budget_cap: Option<f64>,
}

/// Technical debt posture, with derived urgency flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechDebtStatus {
    pub current_level: f64,
    pub max_threshold: f64,
    pub critical_areas: Vec<String>,
    pub repayment_budget: f64,
}

impl TechDebtStatus {
    /// `current > 0.8 * max_threshold`.
    pub fn is_critical(&self) -> bool {
        self.current_level > 0.8 * self.max_threshold
    }

    /// `current > max_threshold`.
    pub fn requires_mandatory_action(&self) -> bool {
        self.current_level > self.max_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactTag {
    Low,
    Medium,
    High,
}

/// Business pressure surrounding the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessContext {
    pub user_impact: ImpactTag,
    pub revenue_impact: ImpactTag,
    pub competitive_pressure: ImpactTag,
    pub market_window: Option<String>,
    pub stakeholder_priorities: Vec<String>,
}

/// A sparse set of updates applied through the CSM's generic updater.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextFieldUpdates {
    pub project_name: Option<String>,
    pub lifecycle_phase: Option<LifecyclePhase>,
    pub deadline: Option<DateTime<Utc>>,
    pub budget_remaining: Option<f64>,
    pub priority_matrix: Option<PriorityMatrix>,
    pub tech_debt_current_level: Option<f64>,
}

impl ContextFieldUpdates {
    pub fn is_empty(&self) -> bool {
        self.project_name.is_none()
            && self.lifecycle_phase.is_none()
            && self.deadline.is_none()
            && self.budget_remaining.is_none()
            && self.priority_matrix.is_none()
            && self.tech_debt_current_level.is_none()
    }
}

/// The authoritative description of a project's current situation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProjectContext {
    #[validate(length(min = 1, max = 200))]
    pub project_id: String,
    #[validate(length(min = 1, max = 200))]
    pub project_name: String,
    pub lifecycle_phase: LifecyclePhase,
    pub deadline: DateTime<Utc>,
    pub budget_remaining: f64,
    pub priority_matrix: PriorityMatrix,
    pub constraints: ProjectConstraints,
    pub tech_debt: TechDebtStatus,
    pub business_context: BusinessContext,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
    pub version: u64,
}

impl ProjectContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_id: impl Into<String>,
        project_name: impl Into<String>,
        lifecycle_phase: LifecyclePhase,
        deadline: DateTime<Utc>,
        budget_remaining: f64,
        priority_matrix: PriorityMatrix,
        constraints: ProjectConstraints,
        tech_debt: TechDebtStatus,
        business_context: BusinessContext,
        updated_by: impl Into<String>,
    ) -> Result<Self, ContextError> {
        if deadline <= Utc::now() {
            return Err(ContextError::DeadlineInPast);
        }
        if !(0.0..=1.0).contains(&budget_remaining) {
            return Err(ContextError::OutOfRange {
                field: "budget_remaining",
                value: budget_remaining,
            });
        }
        let now = Utc::now();
        let context = Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            lifecycle_phase,
            deadline,
            budget_remaining,
            priority_matrix,
            constraints,
            tech_debt,
            business_context,
            created_at: now,
            last_updated: now,
            updated_by: updated_by.into(),
            version: 1,
        };
        context.validate()?;
        Ok(context)
    }

    /// Targeted mutator: revalidates, bumps `version`, refreshes metadata.
    pub fn update_priority_matrix(
        &mut self,
        speed: f64,
        quality: f64,
        cost: f64,
        updated_by: impl Into<String>,
    ) -> Result<(), ContextError> {
        let matrix = PriorityMatrix::new(speed, quality, cost)?;
        self.priority_matrix = matrix;
        self.bump(updated_by);
        Ok(())
    }

    /// Targeted mutator: revalidates, bumps `version`, refreshes metadata.
    pub fn update_tech_debt(
        &mut self,
        level: f64,
        updated_by: impl Into<String>,
    ) -> Result<(), ContextError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(ContextError::OutOfRange {
                field: "tech_debt.current_level",
                value: level,
            });
        }
        self.tech_debt.current_level = level;
        self.bump(updated_by);
        Ok(())
    }

    /// Generic field-update path used by the CSM. Applies every present
    /// field, revalidating as it goes; bumps version even if `updates` is
    /// empty.
    pub fn apply_updates(
        &mut self,
        updates: &ContextFieldUpdates,
        updated_by: impl Into<String>,
    ) -> Result<(), ContextError> {
        // Validate on a working copy first so a failing field leaves no
        // partial update visible.
        let mut working = self.clone();

        if let Some(ref name) = updates.project_name {
            working.project_name = name.clone();
            working.validate()?;
        }
        if let Some(phase) = updates.lifecycle_phase {
            working.lifecycle_phase = phase;
        }
        if let Some(deadline) = updates.deadline {
            working.deadline = deadline;
        }
        if let Some(budget) = updates.budget_remaining {
            if !(0.0..=1.0).contains(&budget) {
                return Err(ContextError::OutOfRange {
                    field: "budget_remaining",
                    value: budget,
                });
            }
            working.budget_remaining = budget;
        }
        if let Some(matrix) = updates.priority_matrix {
            matrix
                .validate()
                .map_err(|_| ContextError::PriorityMatrixInvalid(matrix.speed + matrix.quality + matrix.cost))?;
            working.priority_matrix = matrix;
        }
        if let Some(level) = updates.tech_debt_current_level {
            if !(0.0..=1.0).contains(&level) {
                return Err(ContextError::OutOfRange {
                    field: "tech_debt.current_level",
                    value: level,
                });
            }
            working.tech_debt.current_level = level;
        }

        *self = working;
        self.bump(updated_by);
        Ok(())
    }

    fn bump(&mut self, updated_by: impl Into<String>) {
        self.version += 1;
        self.last_updated = Utc::now();
        self.updated_by = updated_by.into();
    }

    /// `time_pressure_level`: 3/7/21 day thresholds.
    pub fn time_pressure_level(&self) -> TimePressure {
        let days = (self.deadline - Utc::now()).num_seconds() as f64 / 86_400.0;
        if days <= 3.0 {
            TimePressure::Critical
        } else if days <= 7.0 {
            TimePressure::High
        } else if days <= 21.0 {
            TimePressure::Medium
        } else {
            TimePressure::Low
        }
    }

    pub fn dominant_priority(&self) -> &'static str {
        self.priority_matrix.dominant_priority()
    }

    pub fn is_speed_prioritized(&self) -> bool {
        self.priority_matrix.is_speed_prioritized()
    }

    pub fn is_quality_prioritized(&self) -> bool {
        self.priority_matrix.is_quality_prioritized()
    }

    pub fn is_cost_prioritized(&self) -> bool {
        self.priority_matrix.is_cost_prioritized()
    }

    /// Round-trip through a structured map form, excluding derived fields.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("ProjectContext always serializes")
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Convenience factory for a speed-weighted MVP context: loose tech-debt
/// tolerance, no compliance tags.
pub fn create_mvp_context(project_id: impl Into<String>, days_to_deadline: i64) -> ProjectContext {
    ProjectContext::new(
        project_id,
        "MVP project",
        LifecyclePhase::Mvp,
        Utc::now() + chrono::Duration::days(days_to_deadline),
        0.8,
        PriorityMatrix::new(0.6, 0.2, 0.2).expect("valid"),
        ProjectConstraints {
            timeline: "aggressive".to_string(),
            team_capacity: "small".to_string(),
            technical_expertise: Vec::new(),
            compliance_requirements: Vec::new(),
            budget_cap: None,
        },
        TechDebtStatus {
            current_level: 0.3,
            max_threshold: 0.7,
            critical_areas: Vec::new(),
            repayment_budget: 0.1,
        },
        BusinessContext {
            user_impact: ImpactTag::Medium,
            revenue_impact: ImpactTag::Low,
            competitive_pressure: ImpactTag::High,
            market_window: Some("early-adopter window".to_string()),
            stakeholder_priorities: vec!["ship fast".to_string()],
        },
        "system",
    )
    .expect("factory produces a valid context")
}

/// Convenience factory for a quality-weighted production context: compliance
/// tags present, tight tech-debt ceiling.
pub fn create_production_context(
    project_id: impl Into<String>,
    days_to_deadline: i64,
) -> ProjectContext {
    ProjectContext::new(
        project_id,
        "Production project",
        LifecyclePhase::Production,
        Utc::now() + chrono::Duration::days(days_to_deadline),
        0.5,
        PriorityMatrix::new(0.1, 0.7, 0.2).expect("valid"),
        ProjectConstraints {
            timeline: "stable".to_string(),
            team_capacity: "full".to_string(),
            technical_expertise: vec!["security".to_string()],
            compliance_requirements: vec!["SOX".to_string(), "PCI-DSS".to_string()],
            budget_cap: Some(250_000.0),
        },
        TechDebtStatus {
            current_level: 0.2,
            max_threshold: 0.4,
            critical_areas: Vec::new(),
            repayment_budget: 0.2,
        },
        BusinessContext {
            user_impact: ImpactTag::High,
            revenue_impact: ImpactTag::High,
            competitive_pressure: ImpactTag::Medium,
            market_window: None,
            stakeholder_priorities: vec!["reliability".to_string(), "compliance".to_string()],
        },
        "system",
    )
    .expect("factory produces a valid context")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_context() -> ProjectContext {
        create_mvp_context("proj-1", 14)
    }

    #[test]
    fn priority_matrix_rejects_bad_sum() {
        assert!(PriorityMatrix::new(0.5, 0.5, 0.5).is_err());
    }

    #[test]
    fn priority_matrix_accepts_within_tolerance() {
        assert!(PriorityMatrix::new(0.701, 0.2, 0.1).is_ok());
    }

    #[test]
    fn dominant_priority_ties_break_speed_first() {
        let matrix = PriorityMatrix::new(0.34, 0.33, 0.33).unwrap();
        assert_eq!(matrix.dominant_priority(), "speed");
    }

    #[test]
    fn prioritized_checks_are_independent_of_dominance() {
        // Dominant is speed (0.4 > 0.3 > 0.3) but no single weight clears 0.5.
        let matrix = PriorityMatrix::new(0.4, 0.3, 0.3).unwrap();
        assert_eq!(matrix.dominant_priority(), "speed");
        assert!(!matrix.is_speed_prioritized());
        assert!(!matrix.is_quality_prioritized());
        assert!(!matrix.is_cost_prioritized());
    }

    #[test]
    fn update_bumps_version_even_when_empty() {
        let mut ctx = base_context();
        let version_before = ctx.version;
        ctx.apply_updates(&ContextFieldUpdates::default(), "tester")
            .unwrap();
        assert_eq!(ctx.version, version_before + 1);
    }

    #[test]
    fn tech_debt_boundary_is_critical() {
        let status = TechDebtStatus {
            current_level: 0.8 * 0.5 + 0.001,
            max_threshold: 0.5,
            critical_areas: Vec::new(),
            repayment_budget: 0.0,
        };
        assert!(status.is_critical());
        assert!(!status.requires_mandatory_action());
    }

    #[test]
    fn time_pressure_boundaries() {
        let mut ctx = base_context();
        ctx.deadline = Utc::now() + chrono::Duration::days(3);
        assert_eq!(ctx.time_pressure_level(), TimePressure::Critical);
        ctx.deadline = Utc::now() + chrono::Duration::days(4);
        assert_eq!(ctx.time_pressure_level(), TimePressure::High);
        ctx.deadline = Utc::now() + chrono::Duration::days(8);
        assert_eq!(ctx.time_pressure_level(), TimePressure::Medium);
        ctx.deadline = Utc::now() + chrono::Duration::days(22);
        assert_eq!(ctx.time_pressure_level(), TimePressure::Low);
    }

    #[test]
    fn round_trips_through_structured_value() {
        let ctx = base_context();
        let value = ctx.to_value();
        let restored = ProjectContext::from_value(value).unwrap();
        assert_eq!(restored.project_id, ctx.project_id);
        assert_eq!(restored.version, ctx.version);
        assert_eq!(restored.priority_matrix, ctx.priority_matrix);
    }

    #[test]
    fn rejects_empty_project_name() {
        let result = ProjectContext::new(
            "proj-3",
            "",
            LifecyclePhase::Discovery,
            Utc::now() + chrono::Duration::days(10),
            0.5,
            PriorityMatrix::new(0.34, 0.33, 0.33).unwrap(),
            ProjectConstraints {
                timeline: "n/a".to_string(),
                team_capacity: "n/a".to_string(),
                technical_expertise: Vec::new(),
                compliance_requirements: Vec::new(),
                budget_cap: None,
            },
            TechDebtStatus {
                current_level: 0.1,
                max_threshold: 0.5,
                critical_areas: Vec::new(),
                repayment_budget: 0.0,
            },
            BusinessContext {
                user_impact: ImpactTag::Low,
                revenue_impact: ImpactTag::Low,
                competitive_pressure: ImpactTag::Low,
                market_window: None,
                stakeholder_priorities: Vec::new(),
            },
            "tester",
        );
        assert!(matches!(result, Err(ContextError::FieldValidation(_))));
    }

    #[test]
    fn apply_updates_rejects_blank_project_name() {
        let mut ctx = base_context();
        let updates = ContextFieldUpdates {
            project_name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            ctx.apply_updates(&updates, "tester"),
            Err(ContextError::FieldValidation(_))
        ));
    }

    #[test]
    fn rejects_deadline_in_the_past() {
        let result = ProjectContext::new(
            "proj-2",
            "Bad deadline",
            LifecyclePhase::Discovery,
            Utc::now() - chrono::Duration::days(1),
            0.5,
            PriorityMatrix::new(0.34, 0.33, 0.33).unwrap(),
            ProjectConstraints {
                timeline: "n/a".to_string(),
                team_capacity: "n/a".to_string(),
                technical_expertise: Vec::new(),
                compliance_requirements: Vec::new(),
                budget_cap: None,
            },
            TechDebtStatus {
                current_level: 0.1,
                max_threshold: 0.5,
                critical_areas: Vec::new(),
                repayment_budget: 0.0,
            },
            BusinessContext {
                user_impact: ImpactTag::Low,
                revenue_impact: ImpactTag::Low,
                competitive_pressure: ImpactTag::Low,
                market_window: None,
                stakeholder_priorities: Vec::new(),
            },
            "tester",
        );
        assert!(matches!(result, Err(ContextError::DeadlineInPast)));
    }
}
