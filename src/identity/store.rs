//! Identity persistence.
//! `FileIdentityStore` keeps one JSON document per user under
//! `<root>/users/<id>.json` with in-memory unique indexes over email and
//! handle. The indexes live behind a single RwLock, making `create` an atomic
//! check-and-insert: that lock is the uniqueness constraint the allocator's
//! check-then-act race relies on, not the callers' pre-checks.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use super::user::{NewUser, User};

pub trait IdentityStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Persist a new identity, rejecting duplicate email or handle with
    /// `AppError::Duplicate`.
    fn create(&self, new_user: NewUser) -> AppResult<User>;
    fn exists_by_handle(&self, handle: &str) -> AppResult<bool>;
}

struct Indexes {
    /// email -> user id
    by_email: HashMap<String, String>,
    handles: HashSet<String>,
}

pub struct FileIdentityStore {
    root: PathBuf,
    inner: RwLock<Indexes>,
}

impl FileIdentityStore {
    /// Open (or initialize) a store rooted at the given folder, rebuilding the
    /// unique indexes by scanning the existing user documents.
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let users_dir = root.join("users");
        fs::create_dir_all(&users_dir)?;
        let mut by_email = HashMap::new();
        let mut handles = HashSet::new();
        for entry in fs::read_dir(&users_dir)? {
            let p = entry?.path();
            if p.extension().and_then(|e| e.to_str()) != Some("json") { continue; }
            match fs::read_to_string(&p).map_err(anyhow::Error::from)
                .and_then(|text| serde_json::from_str::<User>(&text).map_err(anyhow::Error::from))
            {
                Ok(user) => {
                    by_email.insert(user.email.clone(), user.id.clone());
                    handles.insert(user.username.clone());
                }
                Err(e) => {
                    // Skip unreadable documents rather than refusing to start.
                    warn!("skipping unreadable user document {}: {}", p.display(), e);
                }
            }
        }
        debug!(target: "inkpress::identity", "identity store opened: root='{}' users={}", root.display(), by_email.len());
        Ok(Self { root, inner: RwLock::new(Indexes { by_email, handles }) })
    }

    fn user_path(&self, id: &str) -> PathBuf {
        self.root.join("users").join(format!("{}.json", id))
    }

    fn load_user(&self, id: &str) -> AppResult<User> {
        let text = fs::read_to_string(self.user_path(id))?;
        serde_json::from_str(&text).map_err(|e| AppError::internal(format!("corrupt user document {}: {}", id, e)))
    }
}

impl IdentityStore for FileIdentityStore {
    fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let id = { self.inner.read().by_email.get(email).cloned() };
        match id {
            Some(id) => Ok(Some(self.load_user(&id)?)),
            None => Ok(None),
        }
    }

    fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut idx = self.inner.write();
        if idx.by_email.contains_key(&new_user.email) {
            return Err(AppError::duplicate("Email already exists"));
        }
        if idx.handles.contains(&new_user.username) {
            return Err(AppError::duplicate("Username already exists"));
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: new_user.email,
            username: new_user.username,
            fullname: new_user.fullname,
            profile_img: new_user.profile_img,
            auth: new_user.auth,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        let text = serde_json::to_string_pretty(&user)
            .map_err(|e| AppError::internal(format!("serialize user: {}", e)))?;
        // Write under the lock so a failed write never leaves an index entry
        // pointing at a missing document.
        fs::write(self.user_path(&user.id), text)?;
        idx.by_email.insert(user.email.clone(), user.id.clone());
        idx.handles.insert(user.username.clone());
        debug!(target: "inkpress::identity", "user created: id={} username={}", user.id, user.username);
        Ok(user)
    }

    fn exists_by_handle(&self, handle: &str) -> AppResult<bool> {
        Ok(self.inner.read().handles.contains(handle))
    }
}
