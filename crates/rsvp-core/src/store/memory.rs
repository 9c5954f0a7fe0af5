use core::convert::Infallible;
use std::collections::{BTreeMap, HashMap};

use crate::{
    cache::{CacheEntry, CacheStore},
    progress::{ProgressStore, ReadingProgress},
    settings::SettingsStore,
};

/// Volatile store used when no database is configured, and by tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    progress: HashMap<String, ReadingProgress>,
    cache_entries: HashMap<String, CacheEntry>,
    cache_pages: BTreeMap<(String, u32), Vec<u8>>,
    settings: HashMap<String, String>,
    progress_writes: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful progress upserts so far.
    pub fn progress_writes(&self) -> u32 {
        self.progress_writes
    }

    /// Overwrites one stored page blob in place.
    pub fn put_raw_page(&mut self, doc_id: &str, page: u32, bytes: Vec<u8>) {
        self.cache_pages.insert((doc_id.to_owned(), page), bytes);
    }
}

impl ProgressStore for MemoryStore {
    type Error = Infallible;

    fn load_progress(&mut self, doc_id: &str) -> Result<Option<ReadingProgress>, Self::Error> {
        Ok(self.progress.get(doc_id).cloned())
    }

    fn save_progress(&mut self, progress: &ReadingProgress) -> Result<(), Self::Error> {
        self.progress
            .insert(progress.doc_id.clone(), progress.clone());
        self.progress_writes = self.progress_writes.saturating_add(1);
        Ok(())
    }

    fn delete_progress(&mut self, doc_id: &str) -> Result<(), Self::Error> {
        self.progress.remove(doc_id);
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    type Error = Infallible;

    fn load_entry(&mut self, doc_id: &str) -> Result<Option<CacheEntry>, Self::Error> {
        Ok(self.cache_entries.get(doc_id).cloned())
    }

    fn load_page(&mut self, doc_id: &str, page: u32) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.cache_pages.get(&(doc_id.to_owned(), page)).cloned())
    }

    fn store_entry(&mut self, entry: &CacheEntry, pages: &[Vec<u8>]) -> Result<(), Self::Error> {
        self.remove_entry(&entry.doc_id)?;
        for (index, page) in pages.iter().enumerate() {
            self.cache_pages
                .insert((entry.doc_id.clone(), index as u32), page.clone());
        }
        self.cache_entries.insert(entry.doc_id.clone(), entry.clone());
        Ok(())
    }

    fn remove_entry(&mut self, doc_id: &str) -> Result<(), Self::Error> {
        self.cache_entries.remove(doc_id);
        self.cache_pages.retain(|(owner, _), _| owner != doc_id);
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    type Error = Infallible;

    fn get_setting(&mut self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.settings.get(key).cloned())
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.settings.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
