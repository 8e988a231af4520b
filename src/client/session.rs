use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::auth::types::PublicUser;
use crate::error::{AppError, StorageError};

const TOKEN_FILE: &str = "token";
const USER_FILE: &str = "user.json";

/// The client-held session: the bearer token plus the cached user snapshot
/// persisted alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub user: PublicUser,
}

/// Durable, single-slot storage for the current session. The token and the
/// user snapshot are kept under two files in one directory; a token is
/// never loadable without its matching user.
///
/// Writes serialize on an internal lock so that a clear triggered by a
/// detected expiry cannot interleave with an in-flight save.
pub struct SessionStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store rooted in the platform-local data directory.
    pub fn open_default() -> Result<Self, AppError> {
        let base = dirs::data_local_dir().ok_or(StorageError::Unavailable)?;
        Ok(Self::new(base.join("authgate").join("session")))
    }

    /// Persists the session, overwriting any prior one. The user snapshot
    /// lands before the token so a crash in between leaves no orphan token.
    pub fn save(&self, token: &str, user: &PublicUser) -> Result<(), AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(&self.dir).map_err(StorageError::Io)?;

        let user_json =
            serde_json::to_vec_pretty(user).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        self.write_atomic(USER_FILE, &user_json)?;
        self.write_atomic(TOKEN_FILE, token.as_bytes())?;

        Ok(())
    }

    /// Returns the current session, if a complete one is stored. A
    /// half-written or unparsable session is discarded and reported absent.
    /// Expiry is not checked here; that is the verifier's job.
    pub fn load(&self) -> Result<Option<StoredSession>, AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let token = match fs::read_to_string(self.dir.join(TOKEN_FILE)) {
            Ok(token) => token,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e).into()),
        };

        let user_json = match fs::read(self.dir.join(USER_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.remove_both()?;
                return Ok(None);
            }
            Err(e) => return Err(StorageError::Io(e).into()),
        };

        match serde_json::from_slice::<PublicUser>(&user_json) {
            Ok(user) => Ok(Some(StoredSession { token, user })),
            Err(_) => {
                self.remove_both()?;
                Ok(None)
            }
        }
    }

    /// Removes both parts of the session. Safe to call when nothing is
    /// stored.
    pub fn clear(&self) -> Result<(), AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.remove_both()
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let tmp = self.dir.join(format!("{}.tmp", name));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, self.dir.join(name))?;
        Ok(())
    }

    // Token goes first so a failure halfway never leaves a token without
    // its user.
    fn remove_both(&self) -> Result<(), AppError> {
        for name in [TOKEN_FILE, USER_FILE] {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::Io(e).into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_user() -> PublicUser {
        PublicUser {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            full_name: "A".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let user = sample_user();

        store.save("tok-1", &user).unwrap();
        let session = store.load().unwrap().unwrap();

        assert_eq!(session.token, "tok-1");
        assert_eq!(session.user, user);
    }

    #[test]
    fn test_save_overwrites_previous_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let first = sample_user();
        let second = sample_user();

        store.save("tok-1", &first).unwrap();
        store.save("tok-2", &second).unwrap();

        let session = store.load().unwrap().unwrap();
        assert_eq!(session.token, "tok-2");
        assert_eq!(session.user.id, second.id);
    }

    #[test]
    fn test_load_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        store.save("tok-1", &sample_user()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);

        // Second clear with nothing stored still succeeds
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_orphan_token_discarded() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join(TOKEN_FILE), "tok-1").unwrap();

        assert_eq!(store.load().unwrap(), None);
        // The orphan was cleaned up
        assert!(!dir.path().join(TOKEN_FILE).exists());
    }

    #[test]
    fn test_corrupt_user_snapshot_discarded() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        store.save("tok-1", &sample_user()).unwrap();
        fs::write(dir.path().join(USER_FILE), b"{ not json").unwrap();

        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.load().unwrap(), None);
    }
}
