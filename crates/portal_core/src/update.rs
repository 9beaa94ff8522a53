use crate::{AuthFailureReason, Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
///
/// Responses tagged with a generation other than the current one are dropped,
/// so a logout (or an unauthorized response) always wins over a login reply
/// that was still in flight.
pub fn update(mut state: SessionState, msg: Msg) -> (SessionState, Vec<Effect>) {
    let effects = match msg {
        Msg::LoginStarted => {
            state.begin_request();
            Vec::new()
        }
        Msg::LoginSucceeded {
            generation,
            session,
        } => {
            if !state.is_current(generation) {
                return (state, Vec::new());
            }
            let token = session.token.clone();
            state.establish(session);
            vec![
                Effect::PersistToken {
                    token: token.clone(),
                },
                Effect::AttachCredentials { token: Some(token) },
            ]
        }
        Msg::LoginFailed { generation, reason } => {
            if state.is_current(generation) {
                state.fail_request(reason);
            }
            Vec::new()
        }
        Msg::LogoutRequested => {
            state.clear(None);
            vec![Effect::ClearToken, Effect::AttachCredentials { token: None }]
        }
        Msg::Unauthorized { generation } => {
            // A 401 from before the latest login must not end the newer session.
            if !state.is_current(generation) {
                return (state, Vec::new());
            }
            state.clear(Some(AuthFailureReason::SessionExpired));
            vec![Effect::ClearToken, Effect::AttachCredentials { token: None }]
        }
    };

    (state, effects)
}
