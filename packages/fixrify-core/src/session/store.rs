//! Durable session storage with platform keyring and file-based fallback.
//!
//! Storage priority:
//! 1. Platform keyring (if `keyring-storage` feature enabled and available)
//! 2. File-based storage (three entries under the app config dir)
//!
//! The file layout is three stable keys (`access_token`, `refresh_token`
//! and `profile.json`) so that absence of all three denotes "logged out".
//! Every `set`/`clear` persists before returning; a process restart restores
//! whatever was last written.

use crate::session::types::{Session, UserProfile};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(feature = "keyring-storage")]
use keyring::Entry;

/// Service name used for keyring storage
#[cfg(feature = "keyring-storage")]
const KEYRING_SERVICE: &str = "fixrify-client";
/// Username used for keyring entry
#[cfg(feature = "keyring-storage")]
const KEYRING_USER: &str = "session";

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const PROFILE_KEY: &str = "profile.json";

/// Get the fixrify config directory
fn default_storage_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .context("Failed to find config directory")?;
    Ok(config_dir.join("fixrify"))
}

/// Write a storage entry with restrictive permissions on Unix.
fn write_entry(path: &Path, contents: &str) -> Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600) // Owner read/write only
            .open(path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        let mut file = std::io::BufWriter::new(file);
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write {:?}", path))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    }

    Ok(())
}

fn remove_entry(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to delete {:?}: {}", path, e);
        }
    }
}

fn read_entry(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(Some(content))
}

/// Durable holder of the current session.
///
/// `get` returns an in-memory snapshot; `set` and `clear` persist
/// synchronously before returning, so a subsequent read observes the new
/// value. The session is the only shared mutable resource in the client and
/// is written solely by the session manager and the refresh coordinator.
pub struct TokenStore {
    dir: PathBuf,
    use_keyring: bool,
    session: Mutex<Session>,
}

impl TokenStore {
    /// Open the store at the platform default location, restoring any
    /// persisted session.
    pub fn open() -> Result<Self> {
        Self::new(default_storage_dir()?, cfg!(feature = "keyring-storage"))
    }

    /// Open a file-only store rooted at an explicit directory.
    ///
    /// Used by tests and non-standard deployments; never touches the keyring.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(dir.into(), false)
    }

    fn new(dir: PathBuf, use_keyring: bool) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(&dir).context("Failed to create storage directory")?;
        }
        let store = Self {
            dir,
            use_keyring,
            session: Mutex::new(Session::default()),
        };
        let restored = store.load()?;
        *store.session.lock().expect("session lock poisoned") = restored;
        Ok(store)
    }

    /// Snapshot of the current session.
    pub fn get(&self) -> Session {
        self.session.lock().expect("session lock poisoned").clone()
    }

    /// Replace the session, persisting before the in-memory value changes.
    pub fn set(&self, session: Session) -> Result<()> {
        self.persist(&session)?;
        *self.session.lock().expect("session lock poisoned") = session;
        Ok(())
    }

    /// Destroy the session: all storage entries removed, snapshot reset.
    pub fn clear(&self) -> Result<()> {
        if self.use_keyring {
            #[cfg(feature = "keyring-storage")]
            delete_session_from_keyring()?;
        }
        self.delete_files();
        *self.session.lock().expect("session lock poisoned") = Session::default();
        tracing::debug!("session storage cleared");
        Ok(())
    }

    fn persist(&self, session: &Session) -> Result<()> {
        if self.use_keyring {
            #[cfg(feature = "keyring-storage")]
            return self.save_to_keyring(session);
        }
        self.save_to_files(session)
    }

    fn load(&self) -> Result<Session> {
        if self.use_keyring {
            #[cfg(feature = "keyring-storage")]
            return self.load_from_keyring();
        }
        self.load_from_files()
    }

    // ========================================================================
    // File-based storage (always available)
    // ========================================================================

    fn save_to_files(&self, session: &Session) -> Result<()> {
        match &session.access_token {
            Some(token) => write_entry(&self.dir.join(ACCESS_TOKEN_KEY), token)?,
            None => remove_entry(&self.dir.join(ACCESS_TOKEN_KEY)),
        }
        match &session.refresh_token {
            Some(token) => write_entry(&self.dir.join(REFRESH_TOKEN_KEY), token)?,
            None => remove_entry(&self.dir.join(REFRESH_TOKEN_KEY)),
        }
        match &session.user {
            Some(user) => {
                let json = serde_json::to_string(user).context("Failed to serialize profile")?;
                write_entry(&self.dir.join(PROFILE_KEY), &json)?;
            }
            None => remove_entry(&self.dir.join(PROFILE_KEY)),
        }
        tracing::debug!("session saved to {:?}", self.dir);
        Ok(())
    }

    fn load_from_files(&self) -> Result<Session> {
        let access_token = read_entry(&self.dir.join(ACCESS_TOKEN_KEY))?;
        let refresh_token = read_entry(&self.dir.join(REFRESH_TOKEN_KEY))?;
        let user = match read_entry(&self.dir.join(PROFILE_KEY))? {
            Some(json) => Some(
                serde_json::from_str::<UserProfile>(&json)
                    .context("Failed to parse stored profile")?,
            ),
            None => None,
        };
        Ok(Session {
            access_token,
            refresh_token,
            user,
        })
    }

    fn delete_files(&self) {
        remove_entry(&self.dir.join(ACCESS_TOKEN_KEY));
        remove_entry(&self.dir.join(REFRESH_TOKEN_KEY));
        remove_entry(&self.dir.join(PROFILE_KEY));
    }

    // ========================================================================
    // Keyring-based storage (optional, platform-specific)
    // ========================================================================

    #[cfg(feature = "keyring-storage")]
    fn save_to_keyring(&self, session: &Session) -> Result<()> {
        let entry = match keyring_entry() {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    "Failed to create keyring entry for saving: {}, using file storage",
                    e
                );
                return self.save_to_files(session);
            }
        };

        let json = serde_json::to_string(session).context("Failed to serialize session")?;

        if let Err(e) = entry.set_password(&json) {
            tracing::warn!("Failed to save session to keyring: {}, using file storage", e);
            return self.save_to_files(session);
        }

        // Verify the save worked
        match keyring_entry()?.get_password() {
            Ok(stored) if stored == json => {
                tracing::debug!("session verified in keyring after save");
                // Also save to files as backup
                if let Err(e) = self.save_to_files(session) {
                    tracing::debug!("Failed to save backup session to files: {}", e);
                }
                Ok(())
            }
            Ok(_) | Err(keyring::Error::NoEntry) => {
                tracing::warn!("session missing or mismatched after save, using file storage");
                self.save_to_files(session)
            }
            Err(e) => {
                tracing::warn!("Could not verify session after save: {}", e);
                if let Err(e) = self.save_to_files(session) {
                    tracing::warn!("Failed to save backup session to files: {}", e);
                }
                Ok(())
            }
        }
    }

    #[cfg(feature = "keyring-storage")]
    fn load_from_keyring(&self) -> Result<Session> {
        let entry = match keyring_entry() {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    "Failed to create keyring entry for reading: {}, trying file fallback",
                    e
                );
                return self.load_from_files();
            }
        };

        match entry.get_password() {
            Ok(json) => {
                tracing::debug!("session loaded from keyring");
                serde_json::from_str(&json).context("Failed to parse session from keyring")
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("No session in keyring, trying file fallback");
                self.load_from_files()
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load session from keyring: {}, trying file fallback",
                    e
                );
                self.load_from_files()
            }
        }
    }
}

#[cfg(feature = "keyring-storage")]
fn keyring_entry() -> Result<Entry> {
    Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| anyhow::anyhow!("Failed to create keyring entry: {}", e))
}

#[cfg(feature = "keyring-storage")]
fn delete_session_from_keyring() -> Result<()> {
    let entry = keyring_entry()?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
        Err(e) => Err(anyhow::anyhow!("Failed to delete session from keyring: {}", e)),
    }
}

/// Describe the session storage location (for documentation/debugging)
pub fn storage_info() -> String {
    #[cfg(all(feature = "keyring-storage", target_os = "windows"))]
    {
        "Windows Credential Manager (with file fallback)".to_string()
    }
    #[cfg(all(feature = "keyring-storage", target_os = "macos"))]
    {
        "macOS Keychain (with file fallback)".to_string()
    }
    #[cfg(all(feature = "keyring-storage", target_os = "linux"))]
    {
        "Linux Secret Service (GNOME Keyring/KWallet, with file fallback)".to_string()
    }
    #[cfg(not(feature = "keyring-storage"))]
    {
        let path = default_storage_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "~/.config/fixrify".to_string());
        format!("File-based storage: {}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::Role;

    fn sample_session() -> Session {
        Session {
            access_token: Some("access-abc".into()),
            refresh_token: Some("refresh-xyz".into()),
            user: Some(UserProfile {
                id: 42,
                name: "Pat".into(),
                email: "pat@example.com".into(),
                role: Role::Customer,
                is_approved: true,
                phone: None,
                services: None,
                experience: None,
                about: None,
                created_at: None,
            }),
        }
    }

    #[test]
    fn test_roundtrip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(dir.path()).unwrap();
        store.set(sample_session()).unwrap();

        // A fresh store over the same directory restores the session.
        let reopened = TokenStore::with_dir(dir.path()).unwrap();
        assert_eq!(reopened.get(), sample_session());
        assert!(reopened.get().is_authenticated());
    }

    #[test]
    fn test_clear_removes_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(dir.path()).unwrap();
        store.set(sample_session()).unwrap();
        store.clear().unwrap();

        assert!(!dir.path().join(ACCESS_TOKEN_KEY).exists());
        assert!(!dir.path().join(REFRESH_TOKEN_KEY).exists());
        assert!(!dir.path().join(PROFILE_KEY).exists());
        assert_eq!(store.get(), Session::default());

        let reopened = TokenStore::with_dir(dir.path()).unwrap();
        assert!(!reopened.get().is_authenticated());
    }

    #[test]
    fn test_partial_session_drops_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(dir.path()).unwrap();
        store.set(sample_session()).unwrap();

        // Renewal rewrites only the access token; the other entries survive.
        let mut renewed = store.get();
        renewed.access_token = Some("access-new".into());
        store.set(renewed).unwrap();
        assert_eq!(store.get().refresh_token.as_deref(), Some("refresh-xyz"));

        // Dropping the user removes its entry on disk.
        let mut anonymous = store.get();
        anonymous.user = None;
        store.set(anonymous).unwrap();
        assert!(!dir.path().join(PROFILE_KEY).exists());
        assert!(dir.path().join(ACCESS_TOKEN_KEY).exists());
    }

    #[test]
    fn test_empty_dir_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(dir.path()).unwrap();
        assert_eq!(store.get(), Session::default());
    }
}
