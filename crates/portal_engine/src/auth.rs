use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use portal_core::{
    update, AuthError, AuthFailureReason, Effect, Generation, Msg, Registration, Role, Session,
    SessionState, SessionView, ValidationError,
};
use portal_logging::{portal_debug, portal_error, portal_info, portal_warn};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::http::{Credential, HttpClient};
use crate::token_store::TokenStore;
use crate::{FailureKind, RequestError};

const LOGIN_PATH: &str = "api/auth/login/";
const LOGOUT_PATH: &str = "api/auth/logout/";
const PROFILE_PATH: &str = "api/auth/profile/";
const REGISTER_PATH: &str = "api/auth/register/";

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// The backend refused the account, e.g. the username is taken.
    #[error("registration rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Request(#[from] RequestError),
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: BackendUser,
    /// Token lifetime in seconds, when the backend reports one.
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BackendUser {
    id: Value,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    is_staff: bool,
}

impl BackendUser {
    fn into_session(self, token: String, expiry: Option<SystemTime>) -> Session {
        let full_name = format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string();
        let display_name = [full_name, self.username, self.email]
            .into_iter()
            .find(|name| !name.is_empty())
            .unwrap_or_default();
        let user_id = match self.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        Session {
            user_id,
            display_name,
            role: Role::from_backend(self.role.as_deref(), self.is_staff),
            token,
            expiry,
        }
    }
}

/// Holds the signed-in user of the local backend.
///
/// Every state change goes through [`portal_core::update`]; the resulting
/// effects (token persistence, credential attachment) run while the state
/// lock is held, so they apply in the same order as the state changes.
pub struct AuthService {
    http: HttpClient,
    store: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
}

impl AuthService {
    pub fn new(http: HttpClient, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            store,
            state: Mutex::new(SessionState::new()),
        }
    }

    /// The signed-in session, unless its token lifetime has run out.
    ///
    /// An expired session is ended the same way a 401 would end it.
    pub fn current_session(&self) -> Option<Session> {
        let (session, generation) = {
            let state = self.lock();
            (state.session().cloned()?, state.generation())
        };
        if session.is_expired_at(SystemTime::now()) {
            portal_info!("Session token lifetime elapsed");
            self.expire(generation);
            return None;
        }
        Some(session)
    }

    pub fn view(&self) -> SessionView {
        self.lock().view()
    }

    pub fn generation(&self) -> Generation {
        self.lock().generation()
    }

    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        let generation = self.dispatch(Msg::LoginStarted);
        portal_info!("Signing in {} (generation {})", identifier, generation);

        let result = self.remote_login(identifier, secret).await;
        match result {
            Ok(session) => {
                let current = self.dispatch(Msg::LoginSucceeded {
                    generation,
                    session: session.clone(),
                });
                if current != generation {
                    portal_warn!(
                        "Discarding login reply for generation {} (now {})",
                        generation,
                        current
                    );
                    return Err(AuthError::new(
                        AuthFailureReason::Superseded,
                        "signed out while the login was in flight",
                    ));
                }
                portal_info!(
                    "Signed in as {} ({}), token {}",
                    session.display_name,
                    session.role,
                    portal_logging::token_preview(&session.token)
                );
                Ok(session)
            }
            Err(err) => {
                let reason = login_failure_reason(&err);
                portal_warn!("Sign-in failed: {}", err);
                self.dispatch(Msg::LoginFailed { generation, reason });
                Err(AuthError::new(reason, err.to_string()))
            }
        }
    }

    /// Creates an account. Does not sign in.
    pub async fn register(&self, registration: &Registration) -> Result<(), RegistrationError> {
        registration.validate()?;
        let builder = self
            .http
            .request_with(Method::POST, REGISTER_PATH, None)?
            .json(registration);
        match self.http.send(builder).await {
            Ok(_) => {
                portal_info!("Registered account {}", registration.username);
                Ok(())
            }
            Err(err) if err.is_rejected() => {
                portal_warn!("Registration of {} rejected: {}", registration.username, err);
                Err(RegistrationError::Rejected(
                    err.detail.unwrap_or(err.message),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Signs out. The local session and persisted token are cleared before
    /// the remote call is made, and remote failures are only logged.
    pub async fn logout(&self) {
        let request = self.http.request(Method::POST, LOGOUT_PATH);
        self.dispatch(Msg::LogoutRequested);
        portal_info!("Signed out locally");

        let result = match request {
            Ok(builder) => self.http.send(builder).await.map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            portal_warn!("Remote sign-out failed (ignored): {}", err);
        }
    }

    /// Re-establishes the session from a persisted token, if any.
    ///
    /// A token the backend no longer accepts is removed from the store.
    pub async fn restore(&self) -> Option<Session> {
        let token = self.store.load()?;
        let generation = self.dispatch(Msg::LoginStarted);
        portal_debug!(
            "Restoring session from token {}",
            portal_logging::token_preview(&token)
        );

        let result = self.fetch_profile(&token).await;
        match result {
            Ok(user) => {
                let session = user.into_session(token, None);
                let current = self.dispatch(Msg::LoginSucceeded {
                    generation,
                    session: session.clone(),
                });
                (current == generation).then_some(session)
            }
            Err(err) => {
                portal_warn!("Stored session rejected: {}", err);
                let mut guard = self.lock();
                let state = std::mem::take(&mut *guard);
                let (state, _) = update(
                    state,
                    Msg::LoginFailed {
                        generation,
                        reason: login_failure_reason(&err),
                    },
                );
                let still_current = state.generation() == generation;
                *guard = state;
                if still_current {
                    if let Err(err) = self.store.clear() {
                        portal_error!("Failed to remove stale token: {}", err);
                    }
                }
                None
            }
        }
    }

    /// Ends the session after a protected call issued under `generation` came back 401.
    pub fn expire(&self, generation: Generation) {
        let before = self.generation();
        let after = self.dispatch(Msg::Unauthorized { generation });
        if after != before {
            portal_warn!("Session expired; signed out");
        }
    }

    async fn remote_login(&self, identifier: &str, secret: &str) -> Result<Session, RequestError> {
        let builder = self
            .http
            .request(Method::POST, LOGIN_PATH)?
            .json(&json!({ "email": identifier, "password": secret }));
        let response = self.http.send(builder).await?;
        let body: LoginResponse = self.http.read_json(response).await?;
        let expiry = body
            .expires_in
            .map(|seconds| SystemTime::now() + Duration::from_secs(seconds));
        Ok(body.user.into_session(body.token, expiry))
    }

    async fn fetch_profile(&self, token: &str) -> Result<BackendUser, RequestError> {
        let builder = self.http.request_with(
            Method::GET,
            PROFILE_PATH,
            Some(Credential::Token(token.to_string())),
        )?;
        let response = self.http.send(builder).await?;
        self.http.read_json(response).await
    }

    fn dispatch(&self, msg: Msg) -> Generation {
        let mut guard = self.lock();
        let state = std::mem::take(&mut *guard);
        let (state, effects) = update(state, msg);
        *guard = state;
        for effect in effects {
            self.run_effect(effect);
        }
        guard.generation()
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::PersistToken { token } => {
                if let Err(err) = self.store.save(&token) {
                    portal_error!("Failed to persist session token: {}", err);
                }
            }
            Effect::ClearToken => {
                if let Err(err) = self.store.clear() {
                    portal_error!("Failed to clear session token: {}", err);
                }
            }
            Effect::AttachCredentials { token } => {
                self.http.credentials().set(token.map(Credential::Token));
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn login_failure_reason(err: &RequestError) -> AuthFailureReason {
    match err.kind {
        FailureKind::Unauthorized => AuthFailureReason::InvalidCredentials,
        FailureKind::HttpStatus(code) if (400..500).contains(&code) => {
            AuthFailureReason::InvalidCredentials
        }
        _ => AuthFailureReason::Network,
    }
}
