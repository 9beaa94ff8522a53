/// Where a repository upload session currently stands.
///
/// `Anonymous -> Authenticating -> Authenticated -> (CreatingItem ->
/// PatchingMetadata -> AttachingFiles)* -> Authenticated`. An unauthorized
/// response or a logout drops back to `Anonymous` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepositoryPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    CreatingItem,
    PatchingMetadata,
    AttachingFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryEvent {
    LoginStarted,
    LoginSucceeded,
    LoginFailed,
    CreateStarted,
    CreateSucceeded,
    CreateFailed,
    /// Metadata patch finished; success or failure both move on.
    PatchFinished,
    /// Every attach finished, whatever their individual outcomes.
    AttachmentsFinished,
    Unauthorized,
    LoggedOut,
}

impl RepositoryPhase {
    /// Applies an event. Events that make no sense in the current phase leave it unchanged.
    pub fn next(self, event: RepositoryEvent) -> Self {
        use RepositoryEvent as E;
        use RepositoryPhase as P;

        match (self, event) {
            (_, E::Unauthorized | E::LoggedOut) => P::Anonymous,
            (P::Anonymous | P::Authenticated, E::LoginStarted) => P::Authenticating,
            (P::Authenticating, E::LoginSucceeded) => P::Authenticated,
            (P::Authenticating, E::LoginFailed) => P::Anonymous,
            (P::Authenticated, E::CreateStarted) => P::CreatingItem,
            (P::CreatingItem, E::CreateSucceeded) => P::PatchingMetadata,
            (P::CreatingItem, E::CreateFailed) => P::Authenticated,
            (P::PatchingMetadata, E::PatchFinished) => P::AttachingFiles,
            (P::AttachingFiles, E::AttachmentsFinished) => P::Authenticated,
            (phase, _) => phase,
        }
    }

    pub fn is_authenticated(self) -> bool {
        !matches!(self, RepositoryPhase::Anonymous | RepositoryPhase::Authenticating)
    }
}
