//! Portal core: pure session state machine, domain model and view-model helpers.
mod catalog;
mod dashboard;
mod effect;
mod error;
mod files;
mod msg;
mod outcome;
mod registration;
mod repository;
mod resources;
mod session;
mod state;
mod submission;
mod update;
mod view_model;

pub use catalog::{project_records, Biblio, CatalogRecord, DEFAULT_TITLE};
pub use dashboard::{
    ActionEntry, CollectionStats, DashboardStats, MySubmission, StepActions, UserContentStats,
    WorkflowCounts, WorkspaceCounts,
};
pub use effect::Effect;
pub use error::{AuthError, AuthFailureReason, CreateError, ValidationError};
pub use files::{Collection, StoredFile};
pub use msg::Msg;
pub use outcome::{UploadOutcome, UploadVerdict};
pub use registration::Registration;
pub use repository::{RepositoryEvent, RepositoryPhase};
pub use resources::{
    attachment_file_name, count_by_source, project_resources, AnalyticsReport, DayCount,
    MonthCount, PopularResource, QueryCount, ResourceDetail, ResourceDownload, ResourceFilters,
    ResourceHit, ResourceRecord, ResourceSearchPage, ResourceSource, SourceCount, SourceLinks,
};
pub use session::{Role, Session};
pub use state::{AuthPhase, Generation, SessionState};
pub use submission::{
    metadata_fields, metadata_patch, validate_submission, FileRef, PatchOperation, PatchValue,
    SubmissionForm, Target, UploadFile, WorkspaceItem, DEFAULT_SECTION,
};
pub use update::update;
pub use view_model::SessionView;
