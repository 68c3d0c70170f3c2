use std::{collections::HashMap, sync::Arc};

/// Ephemeral in-memory staging area for downloaded archives.
///
/// Nothing staged here is ever written to the real filesystem; contents are
/// dropped with the stage or on [`Stage::clear`].
#[derive(Default)]
pub struct Stage {
    files: HashMap<String, Arc<[u8]>>,
}

impl Stage {
    pub fn new() -> Self {
        Stage::default()
    }

    /// Stores `data` under `name` and hands back a shared handle to it.
    pub fn put(&mut self, name: &str, data: Vec<u8>) -> Arc<[u8]> {
        let data: Arc<[u8]> = data.into();
        self.files.insert(name.to_string(), data.clone());
        data
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<Arc<[u8]>> {
        self.files.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}
