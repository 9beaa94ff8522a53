use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Repository-wide counts plus the per-collection breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub collections: u64,
    pub archived_items: u64,
    pub workflow_items: u64,
    pub per_collection: Vec<CollectionStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionStats {
    pub id: String,
    pub label: String,
    pub archived_count: u64,
    pub workflow_count: u64,
}

impl DashboardStats {
    /// Largest per-collection total, used to scale bar charts.
    pub fn max_collection_total(&self) -> u64 {
        self.per_collection
            .iter()
            .map(|c| c.archived_count + c.workflow_count)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContentStats {
    #[serde(default)]
    pub my_submission: MySubmission,
    #[serde(default)]
    pub my_actions: BTreeMap<String, BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MySubmission {
    #[serde(default)]
    pub workspace: WorkspaceCounts,
    #[serde(default)]
    pub workflow: WorkflowCounts,
    #[serde(default)]
    pub archived: u64,
    #[serde(default)]
    pub withdrawn: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkspaceCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub reviewstep: Option<u64>,
    #[serde(default)]
    pub editstep: Option<u64>,
    #[serde(default)]
    pub finaleditstep: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    pub action: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepActions {
    pub step: String,
    pub details: Vec<ActionEntry>,
}

impl UserContentStats {
    pub fn has_submissions(&self) -> bool {
        let s = &self.my_submission;
        s.workspace.total > 0
            || s.workflow.total > 0
            || s.workflow.reviewstep.unwrap_or(0) > 0
            || s.workflow.editstep.unwrap_or(0) > 0
            || s.workflow.finaleditstep > 0
            || s.archived > 0
            || s.withdrawn > 0
    }

    pub fn action_entries(&self) -> Vec<StepActions> {
        self.my_actions
            .iter()
            .map(|(step, counts)| StepActions {
                step: step.clone(),
                details: counts
                    .iter()
                    .map(|(action, count)| ActionEntry {
                        action: action.clone(),
                        count: *count,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Count for `action` within `step`, matched case-insensitively. Missing means 0.
    pub fn action_count(&self, step: &str, action: &str) -> u64 {
        self.my_actions
            .get(step)
            .and_then(|counts| {
                counts
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(action))
                    .map(|(_, count)| *count)
            })
            .unwrap_or(0)
    }

    pub fn step_label(step: &str) -> &str {
        match step {
            "editstep" => "Edit Step",
            "reviewstep" => "Review Step",
            "finaleditstep" => "Final Edit Step",
            other => other,
        }
    }
}
