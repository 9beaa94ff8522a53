use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use portal_logging::{portal_debug, portal_warn};
use serde::{Deserialize, Serialize};

use crate::persist::{AtomicFileWriter, PersistError};

const TOKEN_FILENAME: &str = "session.ron";

/// Where the session token survives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> Result<(), PersistError>;
    fn clear(&self) -> Result<(), PersistError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
}

/// Token kept in `{state_dir}/session.ron`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    writer: AtomicFileWriter,
}

impl FileTokenStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(state_dir),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(TOKEN_FILENAME)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                portal_warn!("Failed to read session token from {:?}: {}", path, err);
                return None;
            }
        };
        match ron::from_str::<PersistedSession>(&content) {
            Ok(persisted) if !persisted.token.is_empty() => Some(persisted.token),
            Ok(_) => None,
            Err(err) => {
                portal_warn!("Failed to parse session token from {:?}: {}", path, err);
                None
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), PersistError> {
        let persisted = PersistedSession {
            token: token.to_string(),
        };
        let content = ron::ser::to_string_pretty(&persisted, ron::ser::PrettyConfig::new())
            .map_err(|err| PersistError::Encode(err.to_string()))?;
        let path = self.writer.write(TOKEN_FILENAME, &content)?;
        portal_debug!("Session token written to {:?}", path);
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        self.writer.remove(TOKEN_FILENAME)
    }
}

/// In-process store, also counting writes so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    token: Option<String>,
    saves: usize,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                token: Some(token.into()),
                saves: 0,
            }),
        }
    }

    pub fn save_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).saves
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    fn save(&self, token: &str) -> Result<(), PersistError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.token = Some(token.to_string());
        inner.saves += 1;
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .token = None;
        Ok(())
    }
}
