//! Upload orchestration.
//!
//! A submission fans out to one pipeline per selected target. Pipelines run
//! concurrently and never cancel each other; their reports are folded into
//! a single [`UploadOutcome`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use portal_core::{
    metadata_fields, metadata_patch, validate_submission, AuthError, AuthFailureReason, CreateError,
    RepositoryEvent, RepositoryPhase, SubmissionForm, Target, UploadFile, UploadOutcome,
    ValidationError, WorkspaceItem,
};
use portal_logging::{portal_debug, portal_info, portal_warn};

use crate::local::LocalBackend;
use crate::repository::RepositoryAdapter;

/// What one target's pipeline achieved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineReport {
    pub success: bool,
    pub errors: Vec<String>,
    pub item: Option<WorkspaceItem>,
}

impl PipelineReport {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![message.into()],
            item: None,
        }
    }
}

/// Sends one submission to one backend.
#[async_trait]
pub trait UploadPipeline: Send + Sync {
    fn target(&self) -> Target;

    async fn run(&self, form: &SubmissionForm, files: &[UploadFile]) -> PipelineReport;
}

/// One multipart upload per file; succeeds when every file was accepted.
pub struct LocalPipeline {
    backend: Arc<LocalBackend>,
}

impl LocalPipeline {
    pub fn new(backend: Arc<LocalBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl UploadPipeline for LocalPipeline {
    fn target(&self) -> Target {
        Target::Local
    }

    async fn run(&self, form: &SubmissionForm, files: &[UploadFile]) -> PipelineReport {
        let uploads = files
            .iter()
            .map(|file| self.backend.upload_file(&form.title, &form.description, file));
        let results = join_all(uploads).await;

        let mut report = PipelineReport::default();
        for (file, result) in files.iter().zip(results) {
            if let Err(err) = result {
                portal_warn!("Local upload of {} failed: {}", file.name, err);
                report.errors.push(format!("{}: {}", file.name, err));
            }
        }
        report.success = !files.is_empty() && report.errors.is_empty();
        report
    }
}

/// Create, patch, attach against the repository.
pub struct RepositoryPipeline {
    adapter: Arc<RepositoryAdapter>,
}

impl RepositoryPipeline {
    pub fn new(adapter: Arc<RepositoryAdapter>) -> Self {
        Self { adapter }
    }

    fn session_expired() -> String {
        AuthError::new(
            AuthFailureReason::SessionExpired,
            "repository session ended during the submission",
        )
        .to_string()
    }
}

#[async_trait]
impl UploadPipeline for RepositoryPipeline {
    fn target(&self) -> Target {
        Target::Repository
    }

    async fn run(&self, form: &SubmissionForm, files: &[UploadFile]) -> PipelineReport {
        if !self.adapter.is_authenticated() {
            return PipelineReport::failed(
                AuthError::new(
                    AuthFailureReason::SessionExpired,
                    "not signed in to the repository",
                )
                .to_string(),
            );
        }
        let Some(collection_id) = form.collection_id.as_deref() else {
            return PipelineReport::failed("no collection selected");
        };

        let epoch = self.adapter.epoch();
        let mut phase = RepositoryPhase::Authenticated.next(RepositoryEvent::CreateStarted);

        let mut item = match self.adapter.create_workspace_item(collection_id).await {
            Ok(item) => item,
            Err(err) if err.is_unauthorized() => {
                phase = phase.next(RepositoryEvent::Unauthorized);
                portal_warn!("Repository session rejected on create ({:?}): {}", phase, err);
                return PipelineReport::failed(Self::session_expired());
            }
            Err(err) => {
                phase = phase.next(RepositoryEvent::CreateFailed);
                portal_warn!("Workspace item creation failed ({:?}): {}", phase, err);
                let err = CreateError {
                    collection_id: collection_id.to_string(),
                    message: err.to_string(),
                };
                return PipelineReport::failed(err.to_string());
            }
        };
        phase = phase.next(RepositoryEvent::CreateSucceeded);

        let mut report = PipelineReport::default();
        if self.adapter.epoch() != epoch {
            report.errors.push(Self::session_expired());
            report.item = Some(item);
            return report;
        }

        let patch = metadata_patch(form);
        match self.adapter.update_metadata(&item.id, &patch).await {
            Ok(()) => item.metadata_fields = metadata_fields(form),
            Err(err) => {
                portal_warn!("Metadata patch of {} failed (continuing): {}", item.id, err);
                report.errors.push(format!("metadata patch failed: {err}"));
            }
        }
        phase = phase.next(RepositoryEvent::PatchFinished);

        if self.adapter.epoch() != epoch {
            report.errors.push(Self::session_expired());
            report.item = Some(item);
            return report;
        }

        let attaches = files
            .iter()
            .map(|file| self.adapter.attach_file(&item.id, file));
        let results = join_all(attaches).await;
        let mut all_attached = true;
        for (file, result) in files.iter().zip(results) {
            match result {
                Ok(file_ref) => item.attached_files.push(file_ref),
                Err(err) => {
                    all_attached = false;
                    portal_warn!("Attaching {} to {} failed: {}", file.name, item.id, err);
                    report.errors.push(format!("attach {} failed: {err}", file.name));
                }
            }
        }
        phase = phase.next(RepositoryEvent::AttachmentsFinished);
        portal_debug!("Repository submission {} finished in {:?}", item.id, phase);

        report.success = all_attached;
        report.item = Some(item);
        report
    }
}

pub struct UploadOrchestrator {
    pipelines: BTreeMap<Target, Arc<dyn UploadPipeline>>,
}

impl UploadOrchestrator {
    pub fn new(local: Arc<LocalBackend>, repository: Arc<RepositoryAdapter>) -> Self {
        Self::with_pipelines(vec![
            Arc::new(LocalPipeline::new(local)) as Arc<dyn UploadPipeline>,
            Arc::new(RepositoryPipeline::new(repository)),
        ])
    }

    pub fn with_pipelines(pipelines: Vec<Arc<dyn UploadPipeline>>) -> Self {
        Self {
            pipelines: pipelines
                .into_iter()
                .map(|pipeline| (pipeline.target(), pipeline))
                .collect(),
        }
    }

    /// Validates the submission, then runs every selected target concurrently.
    ///
    /// Validation failures send nothing. Otherwise the outcome always has one
    /// entry per target; a target that failed keeps its errors while the
    /// others still report success.
    pub async fn submit(
        &self,
        form: SubmissionForm,
        files: Vec<UploadFile>,
        targets: BTreeSet<Target>,
    ) -> Result<UploadOutcome, ValidationError> {
        validate_submission(&form, &files, &targets)?;
        portal_info!(
            "Submitting {:?} ({} file(s)) to {:?}",
            form.title,
            files.len(),
            targets
        );

        let runs = targets.iter().map(|target| {
            let pipeline = self.pipelines.get(target).cloned();
            let form = &form;
            let files = files.as_slice();
            async move {
                let report = match pipeline {
                    Some(pipeline) => pipeline.run(form, files).await,
                    None => PipelineReport::failed("no pipeline configured"),
                };
                (*target, report)
            }
        });
        let reports = join_all(runs).await;

        let mut outcome = UploadOutcome::new();
        for (target, report) in reports {
            outcome.record(target, report.success);
            for error in &report.errors {
                outcome.push_error(target, error);
            }
            if target == Target::Repository {
                outcome.repository_item = report.item;
            }
        }
        portal_info!("{}", outcome.summary());
        Ok(outcome)
    }
}
