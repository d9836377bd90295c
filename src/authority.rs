//! C2: the decision-authority (RACI) matrix — a static, lookup-only table
//! answering "who is responsible/consulted for decision kind X?".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AuthorityError;

/// A Responsible/Accountable/Consulted/Informed assignment for one class of
/// decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaciRole {
    pub responsible: String,
    pub accountable: String,
    pub consulted: Vec<String>,
    pub informed: Vec<String>,
}

/// Static RACI lookup table, immutable once built.
#[derive(Debug, Clone)]
pub struct DecisionAuthorityMatrix {
    rows: HashMap<&'static str, RaciRole>,
}

impl DecisionAuthorityMatrix {
    /// Builds the fixed five-row table.
    pub fn new() -> Self {
        let mut rows = HashMap::new();

        rows.insert(
            "architecture_choices",
            RaciRole {
                responsible: "system-architect".to_string(),
                accountable: "system-architect".to_string(),
                consulted: vec!["coding-agent".to_string(), "qa-engineer".to_string()],
                informed: vec!["project-manager".to_string()],
            },
        );
        rows.insert(
            "testing_strategy",
            RaciRole {
                responsible: "qa-engineer".to_string(),
                accountable: "system-architect".to_string(),
                consulted: vec!["coding-agent".to_string()],
                informed: vec!["project-manager".to_string()],
            },
        );
        rows.insert(
            "tech_debt_prioritization",
            RaciRole {
                responsible: "coding-agent".to_string(),
                accountable: "system-architect".to_string(),
                consulted: vec!["qa-engineer".to_string()],
                informed: vec!["project-manager".to_string()],
            },
        );
        rows.insert(
            "performance_optimization",
            RaciRole {
                responsible: "coding-agent".to_string(),
                accountable: "system-architect".to_string(),
                consulted: vec!["qa-engineer".to_string()],
                informed: vec!["project-manager".to_string()],
            },
        );
        rows.insert(
            "security_implementation",
            RaciRole {
                responsible: "security-engineer".to_string(),
                accountable: "system-architect".to_string(),
                consulted: vec!["coding-agent".to_string(), "qa-engineer".to_string()],
                informed: vec!["project-manager".to_string()],
            },
        );

        Self { rows }
    }

    /// O(1) lookup; unknown decision kinds fail.
    pub fn decision_authority(&self, kind: &str) -> Result<&RaciRole, AuthorityError> {
        self.rows
            .get(kind)
            .ok_or_else(|| AuthorityError::NotFound(kind.to_string()))
    }
}

impl Default for DecisionAuthorityMatrix {
    fn default() -> Self {
        Self::new()
    }
}
