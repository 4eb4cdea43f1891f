use crate::session::models::{TokenPair, UserProfile};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};
use tracing::{debug, error};

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct Entries {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserProfile>,
}

/// Durable key-value persistence for the credential pair and the cached user
/// profile.
///
/// Every operation is synchronous and total: a missing key yields `None` and a
/// disk write failure is logged, never surfaced. Each mutation rewrites the
/// backing file through a temp-file + rename so no observer can see a partial
/// write, `clear()` included.
#[derive(Debug)]
pub struct CredentialStore {
    entries: RwLock<Entries>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// Volatile store, nothing touches the disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            path: None,
        }
    }

    /// Store mirrored to `path`, loading whatever a previous process left
    /// there. An unreadable or corrupt file yields an empty store.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::read_file(&path);

        Self {
            entries: RwLock::new(entries),
            path: Some(path),
        }
    }

    fn read_file(path: &Path) -> Entries {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                error!("discarding unreadable credential file {}: {e}", path.display());
                Entries::default()
            }),
            Err(_) => Entries::default(),
        }
    }

    fn persist(&self, entries: &Entries) {
        let Some(path) = &self.path else {
            return;
        };

        let tmp = path.with_extension("tmp");

        let result = serde_json::to_vec_pretty(entries)
            .map_err(std::io::Error::other)
            .and_then(|bytes| fs::write(&tmp, bytes))
            .and_then(|()| fs::rename(&tmp, path));

        if let Err(e) = result {
            error!("failed to persist credentials to {}: {e}", path.display());
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut Entries)) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut entries);
        self.persist(&entries);
    }

    fn read<T>(&self, get: impl FnOnce(&Entries) -> T) -> T {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        get(&entries)
    }

    pub fn save_tokens(&self, pair: &TokenPair) {
        debug!("saving credential pair");

        self.mutate(|entries| {
            entries.access_token = pair.access_token.clone();
            entries.refresh_token = Some(pair.refresh_token.clone());
        });
    }

    #[must_use]
    pub fn load_tokens(&self) -> Option<TokenPair> {
        self.read(|entries| {
            entries.refresh_token.as_ref().map(|refresh| TokenPair {
                access_token: entries.access_token.clone(),
                refresh_token: refresh.clone(),
            })
        })
    }

    /// Replace only the access token, the renewal path.
    pub fn set_access_token(&self, token: &str) {
        self.mutate(|entries| entries.access_token = Some(token.to_string()));
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read(|entries| entries.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read(|entries| entries.refresh_token.clone())
    }

    pub fn save_user(&self, user: &UserProfile) {
        self.mutate(|entries| entries.user = Some(user.clone()));
    }

    #[must_use]
    pub fn load_user(&self) -> Option<UserProfile> {
        self.read(|entries| entries.user.clone())
    }

    /// Remove both credentials and the cached profile as a unit.
    pub fn clear(&self) {
        debug!("clearing credential store");

        self.mutate(|entries| *entries = Entries::default());
    }
}
