#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the token to the persistent token store.
    PersistToken { token: String },
    /// Remove any persisted token.
    ClearToken,
    /// Replace the credentials attached to outgoing backend requests.
    AttachCredentials { token: Option<String> },
}
