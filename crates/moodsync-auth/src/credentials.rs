//! Credential pair storage with change notification
//!
//! `TokenStore` is the only writer of the current credential pair. The pair
//! is persisted through a `TokenBackend` (a JSON file in production, memory in
//! tests) and every mutation is pushed synchronously to the registered
//! subscribers once the write has landed, so a subscriber that calls `get()`
//! from its callback always sees the new state.
//!
//! The file backend writes with atomic temp-file + rename and 0600
//! permissions, since the file holds live bearer tokens.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Access + refresh token issued at login, registration or refresh.
///
/// A new pair always replaces the old one wholesale. Serialized as
/// `{"accessToken": ..., "refreshToken": ...}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Access token, if non-empty.
    pub fn access(&self) -> Option<&str> {
        Some(self.access_token.as_str()).filter(|token| !token.is_empty())
    }

    /// Refresh token, if non-empty.
    pub fn refresh(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|token| !token.is_empty())
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Raw persistence for the serialized credential pair.
///
/// Backends deal in the serialized document only; parsing and the
/// malformed-means-absent rule live in `TokenStore`.
pub trait TokenBackend: Send + Sync {
    /// Read the persisted document, `None` when nothing is stored.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the persisted document.
    fn save(&self, document: &str) -> Result<()>;

    /// Remove the persisted document. Removing nothing is not an error.
    fn remove(&self) -> Result<()>;
}

/// Token file on disk.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenBackend for FileBackend {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(format!("reading token file: {e}"))),
        }
    }

    fn save(&self, document: &str) -> Result<()> {
        write_atomic(&self.path, document)
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed token file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing token file: {e}"))),
        }
    }
}

/// In-process storage, for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with an arbitrary document (valid or not).
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
        }
    }
}

impl TokenBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>> {
        Ok(lock(&self.document).clone())
    }

    fn save(&self, document: &str) -> Result<()> {
        *lock(&self.document) = Some(document.to_owned());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *lock(&self.document) = None;
        Ok(())
    }
}

type Callback = Arc<dyn Fn(Option<&CredentialPair>) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Owner of the current credential pair.
///
/// Each store is an independent session: subscribers registered on one store
/// never hear about another. Dropping the store drops its subscribers.
pub struct TokenStore {
    backend: Box<dyn TokenBackend>,
    write_lock: Mutex<()>,
    subscribers: Arc<Mutex<Subscribers>>,
}

impl TokenStore {
    pub fn new(backend: impl TokenBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            write_lock: Mutex::new(()),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    /// Store persisted to the token file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(path))
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Current pair, or `None` when logged out.
    ///
    /// Unreadable or malformed persisted data is reported as absent.
    pub fn get(&self) -> Option<CredentialPair> {
        let document = match self.backend.load() {
            Ok(Some(document)) => document,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "token storage unreadable, treating session as logged out");
                return None;
            }
        };

        match serde_json::from_str::<CredentialPair>(&document) {
            Ok(pair) => Some(pair),
            Err(e) => {
                debug!(error = %e, "persisted credential pair is malformed, ignoring");
                None
            }
        }
    }

    /// Persist `pair`, then notify every subscriber with it.
    pub fn set(&self, pair: CredentialPair) -> Result<()> {
        let document = serde_json::to_string(&pair)
            .map_err(|e| Error::Store(format!("serializing credential pair: {e}")))?;
        {
            let _guard = lock(&self.write_lock);
            self.backend.save(&document)?;
        }
        debug!("stored credential pair");
        self.notify(Some(&pair));
        Ok(())
    }

    /// Remove the persisted pair, then notify every subscriber with `None`.
    pub fn clear(&self) -> Result<()> {
        {
            let _guard = lock(&self.write_lock);
            self.backend.remove()?;
        }
        debug!("cleared credential pair");
        self.notify(None);
        Ok(())
    }

    /// Register `callback` for future changes.
    ///
    /// The current value is not delivered; read `get()` once after
    /// subscribing. The callback stays registered until the returned
    /// `Subscription` is dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&CredentialPair>) + Send + Sync + 'static,
    {
        let mut subscribers = lock(&self.subscribers);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.entries.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).entries.len()
    }

    fn notify(&self, pair: Option<&CredentialPair>) {
        // Snapshot so callbacks may subscribe/unsubscribe without deadlocking.
        let callbacks: Vec<Callback> = lock(&self.subscribers)
            .entries
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(pair);
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Handle for a registered subscriber; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    /// Remove the subscriber now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write the token document atomically.
///
/// Writes a uniquely named temp file in the same directory and renames it
/// over the target, so a crash mid-write never leaves a truncated token file
/// and stores sharing a directory never collide. Permissions are 0600 on unix.
fn write_atomic(path: &Path, document: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tokens.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::Io(format!("creating temp token file: {e}")))?;

    tmp.write_all(document.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(tmp.path(), perms)
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tmp.persist(path)
        .map_err(|e| Error::Io(format!("renaming temp token file: {}", e.error)))?;

    debug!(path = %path.display(), "persisted token file");
    Ok(())
}
