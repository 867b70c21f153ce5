use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::api::Identity;

/// Where the verified identity survives between sessions
pub trait IdentityStorage {
    fn load(&self) -> Option<Identity>;
    fn save(&self, identity: &Identity);
    fn clear(&self);
}

/// Storage that forgets everything on exit
#[derive(Debug, Default)]
pub struct MemoryStorage(Mutex<Option<Identity>>);

impl MemoryStorage {
    pub fn with(identity: Identity) -> MemoryStorage {
        MemoryStorage(Mutex::new(Some(identity)))
    }
}

impl IdentityStorage for MemoryStorage {
    fn load(&self) -> Option<Identity> {
        self.0.lock().clone()
    }

    fn save(&self, identity: &Identity) {
        *self.0.lock() = Some(identity.clone());
    }

    fn clear(&self) {
        *self.0.lock() = None;
    }
}

impl<T: IdentityStorage + ?Sized> IdentityStorage for Arc<T> {
    fn load(&self) -> Option<Identity> {
        (**self).load()
    }

    fn save(&self, identity: &Identity) {
        (**self).save(identity)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// The currently logged-in poster, shared by every component of the page.
///
/// Clones share the same state. Only the login flow is expected to call `set`
/// and `clear`, everyone else just reads.
#[derive(Clone)]
pub struct IdentitySession(Arc<Inner>);

struct Inner {
    current: RwLock<Option<Identity>>,
    storage: Box<dyn IdentityStorage + Send + Sync>,
}

impl IdentitySession {
    /// Restore whatever identity was persisted by a previous session
    pub fn load_from<S>(storage: S) -> IdentitySession
    where
        S: 'static + IdentityStorage + Send + Sync,
    {
        let current = storage.load();
        if let Some(i) = &current {
            tracing::debug!(username = %i.username, "restored persisted identity");
        }
        IdentitySession(Arc::new(Inner {
            current: RwLock::new(current),
            storage: Box::new(storage),
        }))
    }

    pub fn in_memory() -> IdentitySession {
        IdentitySession::load_from(MemoryStorage::default())
    }

    pub fn read(&self) -> Option<Identity> {
        self.0.current.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.0.current.read().is_some()
    }

    pub fn set(&self, username: String, email: String) -> Identity {
        let identity = Identity { username, email };
        self.0.storage.save(&identity);
        *self.0.current.write() = Some(identity.clone());
        identity
    }

    pub fn clear(&self) {
        self.0.storage.clear();
        *self.0.current.write() = None;
    }
}

impl PartialEq for IdentitySession {
    fn eq(&self, other: &IdentitySession) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for IdentitySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IdentitySession").field(&self.read()).finish()
    }
}
