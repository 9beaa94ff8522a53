use std::fmt;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Admin,
    Staff,
    #[default]
    User,
}

impl Role {
    /// Maps the backend's free-form role string and staff flag onto a role.
    ///
    /// An explicit `admin` role wins; otherwise the staff flag or a `staff`
    /// role grants [`Role::Staff`].
    pub fn from_backend(role: Option<&str>, is_staff: bool) -> Self {
        match role.map(|r| r.trim().to_ascii_lowercase()) {
            Some(r) if r == "admin" || r == "administrator" => Role::Admin,
            Some(r) if r == "staff" || r == "librarian" => Role::Staff,
            _ if is_staff => Role::Staff,
            _ => Role::User,
        }
    }

    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Staff => write!(f, "staff"),
            Role::User => write!(f, "user"),
        }
    }
}

/// The signed-in user as seen by this client. Lives only as long as the login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
    pub token: String,
    pub expiry: Option<SystemTime>,
}

impl Session {
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}
