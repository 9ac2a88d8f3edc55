//! Persisted key-value state: account, push registration id, online flag

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("preferences I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed preferences: {0}")]
    Json(#[from] serde_json::Error),
}

/// Small persisted store read and written by the registration actions
pub trait PreferenceStore: Send + Sync {
    fn account(&self) -> Option<String>;
    fn set_account(&self, account: Option<String>) -> Result<(), PrefsError>;
    fn registration_id(&self) -> Option<String>;
    fn set_registration_id(&self, reg_id: Option<String>) -> Result<(), PrefsError>;
    fn is_online(&self) -> bool;
    fn set_online(&self, online: bool) -> Result<(), PrefsError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub account: Option<String>,
    pub registration_id: Option<String>,
    pub online: bool,
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<Preferences>,
}

impl MemoryPreferences {
    pub fn new(values: Preferences) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    pub fn snapshot(&self) -> Preferences {
        self.values.lock().clone()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn account(&self) -> Option<String> {
        self.values.lock().account.clone()
    }

    fn set_account(&self, account: Option<String>) -> Result<(), PrefsError> {
        self.values.lock().account = account;
        Ok(())
    }

    fn registration_id(&self) -> Option<String> {
        self.values.lock().registration_id.clone()
    }

    fn set_registration_id(&self, reg_id: Option<String>) -> Result<(), PrefsError> {
        self.values.lock().registration_id = reg_id;
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.values.lock().online
    }

    fn set_online(&self, online: bool) -> Result<(), PrefsError> {
        self.values.lock().online = online;
        Ok(())
    }
}

/// JSON file store, rewritten on every change
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<Preferences>,
}

impl FilePreferences {
    /// Load from `path`; a missing file starts from defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PrefsError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn update(&self, change: impl FnOnce(&mut Preferences)) -> Result<(), PrefsError> {
        let mut values = self.values.lock();
        let mut next = values.clone();
        change(&mut next);
        let bytes = serde_json::to_vec_pretty(&next)?;
        std::fs::write(&self.path, bytes)?;
        *values = next;
        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn account(&self) -> Option<String> {
        self.values.lock().account.clone()
    }

    fn set_account(&self, account: Option<String>) -> Result<(), PrefsError> {
        self.update(|p| p.account = account)
    }

    fn registration_id(&self) -> Option<String> {
        self.values.lock().registration_id.clone()
    }

    fn set_registration_id(&self, reg_id: Option<String>) -> Result<(), PrefsError> {
        self.update(|p| p.registration_id = reg_id)
    }

    fn is_online(&self) -> bool {
        self.values.lock().online
    }

    fn set_online(&self, online: bool) -> Result<(), PrefsError> {
        self.update(|p| p.online = online)
    }
}
