use crate::view_model::SessionView;
use crate::{AuthFailureReason, Session};

/// Monotonic tag stamped on every session-affecting request.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    phase: AuthPhase,
    generation: Generation,
    session: Option<Session>,
    last_failure: Option<AuthFailureReason>,
    dirty: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn last_failure(&self) -> Option<AuthFailureReason> {
        self.last_failure
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            display_name: self.session.as_ref().map(|s| s.display_name.clone()),
            role: self.session.as_ref().map(|s| s.role),
            last_failure: self.last_failure,
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub(crate) fn begin_request(&mut self) {
        self.generation += 1;
        self.phase = AuthPhase::Authenticating;
        self.last_failure = None;
        self.dirty = true;
    }

    pub(crate) fn establish(&mut self, session: Session) {
        self.session = Some(session);
        self.phase = AuthPhase::Authenticated;
        self.dirty = true;
    }

    pub(crate) fn fail_request(&mut self, reason: AuthFailureReason) {
        self.phase = if self.session.is_some() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        };
        self.last_failure = Some(reason);
        self.dirty = true;
    }

    pub(crate) fn clear(&mut self, reason: Option<AuthFailureReason>) {
        self.generation += 1;
        self.session = None;
        self.phase = AuthPhase::Anonymous;
        self.last_failure = reason;
        self.dirty = true;
    }
}
