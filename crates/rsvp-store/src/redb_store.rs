//! Tables:
//!
//! - `reading_progress`: doc id -> `ReadingProgress` (JSON)
//! - `extracted_text_cache`: doc id -> `CacheEntry` (JSON)
//! - `token_pages`: (doc id, page) -> compressed token page
//! - `settings`: key -> value

use std::{path::Path, sync::Arc};

use log::{debug, info};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use rsvp_core::{
    cache::{CacheEntry, CacheStore},
    progress::{ProgressStore, ReadingProgress},
    settings::SettingsStore,
};

use crate::StoreError;

const PROGRESS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("reading_progress");
const CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("extracted_text_cache");
const TOKEN_PAGES_TABLE: TableDefinition<(&str, u32), &[u8]> = TableDefinition::new("token_pages");
const SETTINGS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// Store handle; clones share one database.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens or creates the database and all tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(StoreError::database)?;

        let write_txn = db.begin_write().map_err(StoreError::database)?;
        {
            write_txn
                .open_table(PROGRESS_TABLE)
                .map_err(StoreError::database)?;
            write_txn
                .open_table(CACHE_TABLE)
                .map_err(StoreError::database)?;
            write_txn
                .open_table(TOKEN_PAGES_TABLE)
                .map_err(StoreError::database)?;
            write_txn
                .open_table(SETTINGS_TABLE)
                .map_err(StoreError::database)?;
        }
        write_txn.commit().map_err(StoreError::database)?;

        info!("store: opened path={}", path.as_ref().display());
        Ok(Self { db: Arc::new(db) })
    }

    fn get_json<T>(&self, table: TableDefinition<&str, &[u8]>, key: &str) -> Result<Option<T>, StoreError>
    where
        T: serde::de::DeserializeOwned,
    {
        let read_txn = self.db.begin_read().map_err(StoreError::database)?;
        let table = read_txn.open_table(table).map_err(StoreError::database)?;

        match table.get(key).map_err(StoreError::database)? {
            Some(guard) => serde_json::from_slice(guard.value())
                .map(Some)
                .map_err(StoreError::codec),
            None => Ok(None),
        }
    }

    fn write<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&WriteTransaction) -> Result<(), StoreError>,
    {
        let write_txn = self.db.begin_write().map_err(StoreError::database)?;
        f(&write_txn)?;
        write_txn.commit().map_err(StoreError::database)
    }
}

fn remove_pages(write_txn: &WriteTransaction, doc_id: &str) -> Result<(), StoreError> {
    let old_pages = {
        let meta = write_txn
            .open_table(CACHE_TABLE)
            .map_err(StoreError::database)?;
        let old = meta
            .get(doc_id)
            .map_err(StoreError::database)?
            .map(|guard| guard.value().to_vec());
        match old {
            Some(bytes) => serde_json::from_slice::<CacheEntry>(&bytes)
                .map(|entry| entry.page_count)
                .unwrap_or(0),
            None => 0,
        }
    };

    let mut pages = write_txn
        .open_table(TOKEN_PAGES_TABLE)
        .map_err(StoreError::database)?;
    for page in 0..old_pages {
        pages
            .remove((doc_id, page))
            .map_err(StoreError::database)?;
    }
    Ok(())
}

impl ProgressStore for RedbStore {
    type Error = StoreError;

    fn load_progress(&mut self, doc_id: &str) -> Result<Option<ReadingProgress>, Self::Error> {
        self.get_json(PROGRESS_TABLE, doc_id)
    }

    fn save_progress(&mut self, progress: &ReadingProgress) -> Result<(), Self::Error> {
        let bytes = serde_json::to_vec(progress).map_err(StoreError::codec)?;
        self.write(|write_txn| {
            let mut table = write_txn
                .open_table(PROGRESS_TABLE)
                .map_err(StoreError::database)?;
            table
                .insert(progress.doc_id.as_str(), bytes.as_slice())
                .map_err(StoreError::database)?;
            Ok(())
        })
    }

    fn delete_progress(&mut self, doc_id: &str) -> Result<(), Self::Error> {
        self.write(|write_txn| {
            let mut table = write_txn
                .open_table(PROGRESS_TABLE)
                .map_err(StoreError::database)?;
            table.remove(doc_id).map_err(StoreError::database)?;
            Ok(())
        })
    }
}

impl CacheStore for RedbStore {
    type Error = StoreError;

    fn load_entry(&mut self, doc_id: &str) -> Result<Option<CacheEntry>, Self::Error> {
        self.get_json(CACHE_TABLE, doc_id)
    }

    fn load_page(&mut self, doc_id: &str, page: u32) -> Result<Option<Vec<u8>>, Self::Error> {
        let read_txn = self.db.begin_read().map_err(StoreError::database)?;
        let table = read_txn
            .open_table(TOKEN_PAGES_TABLE)
            .map_err(StoreError::database)?;

        Ok(table
            .get((doc_id, page))
            .map_err(StoreError::database)?
            .map(|guard| guard.value().to_vec()))
    }

    fn store_entry(&mut self, entry: &CacheEntry, pages: &[Vec<u8>]) -> Result<(), Self::Error> {
        let meta = serde_json::to_vec(entry).map_err(StoreError::codec)?;
        self.write(|write_txn| {
            remove_pages(write_txn, &entry.doc_id)?;
            {
                let mut table = write_txn
                    .open_table(TOKEN_PAGES_TABLE)
                    .map_err(StoreError::database)?;
                for (index, page) in pages.iter().enumerate() {
                    table
                        .insert((entry.doc_id.as_str(), index as u32), page.as_slice())
                        .map_err(StoreError::database)?;
                }
            }
            let mut table = write_txn
                .open_table(CACHE_TABLE)
                .map_err(StoreError::database)?;
            table
                .insert(entry.doc_id.as_str(), meta.as_slice())
                .map_err(StoreError::database)?;
            Ok(())
        })?;

        debug!(
            "store: cache entry written doc={} pages={}",
            entry.doc_id,
            pages.len()
        );
        Ok(())
    }

    fn remove_entry(&mut self, doc_id: &str) -> Result<(), Self::Error> {
        self.write(|write_txn| {
            remove_pages(write_txn, doc_id)?;
            let mut table = write_txn
                .open_table(CACHE_TABLE)
                .map_err(StoreError::database)?;
            table.remove(doc_id).map_err(StoreError::database)?;
            Ok(())
        })
    }
}

impl SettingsStore for RedbStore {
    type Error = StoreError;

    fn get_setting(&mut self, key: &str) -> Result<Option<String>, Self::Error> {
        let read_txn = self.db.begin_read().map_err(StoreError::database)?;
        let table = read_txn
            .open_table(SETTINGS_TABLE)
            .map_err(StoreError::database)?;

        Ok(table
            .get(key)
            .map_err(StoreError::database)?
            .map(|guard| guard.value().to_owned()))
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.write(|write_txn| {
            let mut table = write_txn
                .open_table(SETTINGS_TABLE)
                .map_err(StoreError::database)?;
            table.insert(key, value).map_err(StoreError::database)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rsvp_core::{
        cache::{load_stream, save_stream},
        extract::ExtractedPage,
        settings::{KEY_TARGET_WPM, PersistedSettings, load_settings, save_settings},
        tokenizer::generate_token_stream,
        ReaderConfig,
    };
    use tempfile::TempDir;

    use super::*;

    fn create_test_store() -> (RedbStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = RedbStore::open(temp_dir.path().join("reader.redb")).unwrap();
        (store, temp_dir)
    }

    fn progress(index: u32) -> ReadingProgress {
        ReadingProgress {
            doc_id: "doc".into(),
            current_token_index: index,
            current_page_num: 1,
            snippet: "a b c".into(),
            total_words_read: index as u64,
            last_update_time: 1_700_000_000_000,
        }
    }

    #[test]
    fn progress_is_upserted() {
        let (mut store, _temp) = create_test_store();
        assert!(store.load_progress("doc").unwrap().is_none());

        store.save_progress(&progress(3)).unwrap();
        store.save_progress(&progress(9)).unwrap();
        assert_eq!(store.load_progress("doc").unwrap(), Some(progress(9)));

        store.delete_progress("doc").unwrap();
        assert!(store.load_progress("doc").unwrap().is_none());
    }

    #[test]
    fn cached_stream_round_trips_and_shrinks_cleanly() {
        let (mut store, _temp) = create_test_store();
        let text = (0..2_500).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let tokens =
            generate_token_stream(&BTreeMap::from([(1, ExtractedPage::from_text(text))]), "doc");

        let entry = save_stream(&mut store, "doc", &tokens, 1, "hash", 0).unwrap();
        assert_eq!(store.load_entry("doc").unwrap(), Some(entry.clone()));
        assert_eq!(load_stream(&mut store, &entry).unwrap(), tokens);

        let shorter = save_stream(&mut store, "doc", &tokens[..10], 1, "hash", 0).unwrap();
        assert_eq!(shorter.page_count, 1);
        assert!(store.load_page("doc", 2).unwrap().is_none());

        store.remove_entry("doc").unwrap();
        assert!(store.load_entry("doc").unwrap().is_none());
        assert!(store.load_page("doc", 0).unwrap().is_none());
    }

    #[test]
    fn settings_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reader.redb");
        let defaults = PersistedSettings::from_config(&ReaderConfig::default());
        let changed = PersistedSettings {
            target_wpm: 720,
            ..defaults
        };

        {
            let mut store = RedbStore::open(&path).unwrap();
            save_settings(&mut store, &changed).unwrap();
        }

        let mut store = RedbStore::open(&path).unwrap();
        assert_eq!(
            store.get_setting(KEY_TARGET_WPM).unwrap().as_deref(),
            Some("720")
        );
        assert_eq!(load_settings(&mut store, defaults).unwrap(), Some(changed));
    }
}
