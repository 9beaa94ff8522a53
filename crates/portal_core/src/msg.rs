use crate::{AuthFailureReason, Generation, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A login (or token restore) request is about to be sent.
    LoginStarted,
    /// The backend accepted the credentials of the request tagged `generation`.
    LoginSucceeded {
        generation: Generation,
        session: Session,
    },
    /// The request tagged `generation` failed.
    LoginFailed {
        generation: Generation,
        reason: AuthFailureReason,
    },
    /// User asked to sign out. Local state is cleared whatever the remote says.
    LogoutRequested,
    /// A protected call issued under `generation` came back unauthorized.
    Unauthorized { generation: Generation },
}
