use std::collections::BTreeMap;

use crate::{Target, WorkspaceItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadVerdict {
    SavedEverywhere,
    /// At least one target saved the resource; the rest failed.
    PartiallySaved,
    Failed,
}

/// Result of one submit, built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadOutcome {
    pub per_backend_success: BTreeMap<Target, bool>,
    pub errors: Vec<String>,
    pub repository_item: Option<WorkspaceItem>,
}

impl UploadOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, target: Target, success: bool) {
        self.per_backend_success.insert(target, success);
    }

    pub fn push_error(&mut self, target: Target, message: impl AsRef<str>) {
        self.errors.push(format!("{target}: {}", message.as_ref()));
    }

    pub fn succeeded(&self, target: Target) -> bool {
        self.per_backend_success.get(&target).copied().unwrap_or(false)
    }

    /// Partial success counts as success.
    pub fn is_saved(&self) -> bool {
        self.per_backend_success.values().any(|ok| *ok)
    }

    /// Some targets succeeded while others failed.
    pub fn partial_failure(&self) -> bool {
        self.is_saved() && self.per_backend_success.values().any(|ok| !*ok)
    }

    pub fn verdict(&self) -> UploadVerdict {
        if self.partial_failure() {
            UploadVerdict::PartiallySaved
        } else if self.is_saved() {
            UploadVerdict::SavedEverywhere
        } else {
            UploadVerdict::Failed
        }
    }

    /// One-line message for the user, naming the targets that saved the resource.
    pub fn summary(&self) -> String {
        let saved: Vec<String> = self
            .per_backend_success
            .iter()
            .filter(|(_, ok)| **ok)
            .map(|(target, _)| target.to_string())
            .collect();
        match self.verdict() {
            UploadVerdict::SavedEverywhere => {
                format!("Resource saved to {}.", saved.join(" and "))
            }
            UploadVerdict::PartiallySaved => format!(
                "Resource saved to {} ({} error(s) on other targets).",
                saved.join(" and "),
                self.errors.len()
            ),
            UploadVerdict::Failed => "Upload failed.".to_string(),
        }
    }
}
