use crate::{AuthFailureReason, AuthPhase, Role};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub phase: AuthPhase,
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub last_failure: Option<AuthFailureReason>,
    pub dirty: bool,
}

impl SessionView {
    pub fn is_signed_in(&self) -> bool {
        self.phase == AuthPhase::Authenticated && self.display_name.is_some()
    }

    /// The admin dashboard tab is only offered to privileged roles.
    pub fn can_open_admin_dashboard(&self) -> bool {
        self.role.is_some_and(Role::is_privileged)
    }
}
