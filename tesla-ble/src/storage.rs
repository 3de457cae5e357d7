/*!
    Persistence boundary. The engine only ever needs a key→bytes blob store;
    hosts map this onto NVS, a file, or whatever they have.
*/

use std::collections::HashMap;

/// Keys used: `private_key` (SEC1 PEM), `session_vcsec` and
/// `session_infotainment` (serialized `SessionInfo`).
pub trait Storage {
    fn load(&mut self, key: &str) -> Option<Vec<u8>>;
    fn save(&mut self, key: &str, value: &[u8]);
    fn remove(&mut self, key: &str);
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn load(&mut self, key: &str) -> Option<Vec<u8>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &[u8]) {
        (**self).save(key, value)
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }
}

/**
    Volatile store. Useful for tests and for hosts that accept
    re-pairing on every boot.
*/
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&mut self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &[u8]) {
        self.entries.insert(key.to_owned(), value.to_vec());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
