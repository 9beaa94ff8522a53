use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::ValidationError;

/// Submission form section the repository stores descriptive metadata under.
pub const DEFAULT_SECTION: &str = "traditionalpageone";

const TITLE_FIELD: &str = "dc.title";
const AUTHOR_FIELD: &str = "dc.contributor.author";
const ABSTRACT_FIELD: &str = "dc.description.abstract";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    Local,
    Repository,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local => write!(f, "local"),
            Target::Repository => write!(f, "repository"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionForm {
    pub title: String,
    pub authors: String,
    pub description: String,
    pub collection_id: Option<String>,
    /// Additional `schema.element.qualifier -> value` pairs.
    pub extra_fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn file_ref(&self) -> FileRef {
        FileRef {
            name: self.name.clone(),
            size: self.bytes.len() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
}

/// In-progress repository record. Only exists once the create call succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceItem {
    pub id: String,
    pub collection_id: String,
    pub metadata_fields: BTreeMap<String, Vec<String>>,
    pub attached_files: Vec<FileRef>,
}

impl WorkspaceItem {
    pub fn new(id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            metadata_fields: BTreeMap::new(),
            attached_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchValue {
    pub value: String,
}

/// One JSON-Patch style operation against a workspace item section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: PatchValue,
}

impl PatchOperation {
    fn add(field: &str, value: &str) -> Self {
        Self {
            op: "add".to_string(),
            path: format!("/sections/{DEFAULT_SECTION}/{field}/0"),
            value: PatchValue {
                value: value.to_string(),
            },
        }
    }
}

/// Checks a submission before anything is sent.
pub fn validate_submission(
    form: &SubmissionForm,
    files: &[UploadFile],
    targets: &BTreeSet<Target>,
) -> Result<(), ValidationError> {
    if targets.is_empty() {
        return Err(ValidationError::NoTargets);
    }
    if form.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    if targets.contains(&Target::Repository)
        && form
            .collection_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
    {
        return Err(ValidationError::MissingCollection);
    }
    if targets.contains(&Target::Local) && files.is_empty() {
        return Err(ValidationError::MissingFile);
    }
    Ok(())
}

/// Non-empty metadata of the form, keyed by repository field name.
pub fn metadata_fields(form: &SubmissionForm) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();
    let standard = [
        (TITLE_FIELD, form.title.as_str()),
        (AUTHOR_FIELD, form.authors.as_str()),
        (ABSTRACT_FIELD, form.description.as_str()),
    ];
    let extra = form
        .extra_fields
        .iter()
        .filter(|(field, _)| !is_standard_field(field))
        .map(|(field, value)| (field.as_str(), value.as_str()));

    for (field, value) in standard.into_iter().chain(extra) {
        let value = value.trim();
        if !value.is_empty() {
            fields
                .entry(field.to_string())
                .or_insert_with(Vec::new)
                .push(value.to_string());
        }
    }
    fields
}

/// Builds the patch document for a freshly created item.
///
/// Title, authors and abstract come first in that order, followed by extra
/// fields in key order. Blank values are skipped, so an empty form yields an
/// empty patch.
pub fn metadata_patch(form: &SubmissionForm) -> Vec<PatchOperation> {
    let mut ops = Vec::new();
    for (field, value) in [
        (TITLE_FIELD, &form.title),
        (AUTHOR_FIELD, &form.authors),
        (ABSTRACT_FIELD, &form.description),
    ] {
        if !value.trim().is_empty() {
            ops.push(PatchOperation::add(field, value.trim()));
        }
    }
    for (field, value) in &form.extra_fields {
        if !value.trim().is_empty() && !is_standard_field(field) {
            ops.push(PatchOperation::add(field, value.trim()));
        }
    }
    ops
}

fn is_standard_field(field: &str) -> bool {
    matches!(field, TITLE_FIELD | AUTHOR_FIELD | ABSTRACT_FIELD)
}
