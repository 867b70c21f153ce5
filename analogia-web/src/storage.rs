use analogia_client::{api::Identity, IdentityStorage};
use gloo_storage::{LocalStorage, Storage};

const KEY_IDENTITY: &str = "identity";

/// Keeps the verified identity in the browser's LocalStorage
pub struct LocalIdentityStorage;

impl IdentityStorage for LocalIdentityStorage {
    fn load(&self) -> Option<Identity> {
        LocalStorage::get(KEY_IDENTITY).ok()
    }

    fn save(&self, identity: &Identity) {
        if let Err(e) = LocalStorage::set(KEY_IDENTITY, identity) {
            // the session still works, it just won't survive a reload
            tracing::error!("failed saving identity to local storage: {e}");
        }
    }

    fn clear(&self) {
        LocalStorage::delete(KEY_IDENTITY);
    }
}
