use std::collections::HashMap;
use std::sync::Mutex;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

/// String key/value storage that lives as long as the running session.
#[derive(Default)]
pub struct SessionStorage {
    entries: Mutex<HashMap<String, String>>,
    #[cfg(test)]
    accesses: AtomicUsize,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        #[cfg(test)]
        self.accesses.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn set_item(&self, key: &str, value: String) {
        #[cfg(test)]
        self.accesses.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
    }

    /// Ends the session.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Reads plus writes since creation.
    #[cfg(test)]
    pub fn access_count(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }
}
