use crate::models::{GeometryEntry, SettingsRecord, WindowCategory};
use parking_lot::RwLock;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::error::{ShellError, ShellResult};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Load-all / set-all storage underneath [`SettingsStore`].
pub trait SettingsBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load_all(&self) -> ShellResult<Option<SettingsRecord>>;
    fn set_all(&self, record: &SettingsRecord) -> ShellResult<()>;
}

/// Pretty-printed JSON file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsBackend for JsonFileBackend {
    fn load_all(&self) -> ShellResult<Option<SettingsRecord>> {
        let read_err = |source: io::Error| ShellError::PersistenceRead {
            path: self.path.clone(),
            source,
        };

        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(read_err)?;
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| read_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        Ok(Some(record))
    }

    fn set_all(&self, record: &SettingsRecord) -> ShellResult<()> {
        write_record_atomically(&self.path, record).map_err(|source| ShellError::PersistenceWrite {
            path: self.path.clone(),
            source,
        })
    }
}

fn write_record_atomically(path: &Path, record: &SettingsRecord) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)?;
    serde_json::to_writer_pretty(&mut file, record)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    drop(file);

    // Replaces the target in one step on every platform; the live file is never absent.
    fs::rename(tmp, path)

}

/// Owns the in-memory [`SettingsRecord`] and flushes it through a backend on every change.
pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    record: RwLock<SettingsRecord>,
}

impl SettingsStore {
    /// Reads the backend once. A missing record, or one without the `check` marker,
    /// is replaced by the defaults and written back straight away.
    pub fn load(backend: impl SettingsBackend + 'static) -> ShellResult<Self> {
        let record = match backend.load_all()? {
            Some(record) if record.check => record,
            _ => {
                let defaults = SettingsRecord::default();
                backend.set_all(&defaults)?;
                defaults
            }
        };

        Ok(Self {
            backend: Box::new(backend),
            record: RwLock::new(record),
        })
    }

    /// Store that starts from defaults without touching the backend. Used when the
    /// existing file cannot be read; the next change overwrites it.
    pub fn with_defaults(backend: impl SettingsBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            record: RwLock::new(SettingsRecord::default()),
        }
    }

    pub fn record(&self) -> SettingsRecord {
        self.record.read().clone()
    }

    pub fn category(&self, category: WindowCategory) -> GeometryEntry {
        *self.record.read().geometry(category)
    }

    pub fn user_agent(&self) -> Option<String> {
        self.record.read().user_agent.clone()
    }

    pub fn set_category(&self, category: WindowCategory, entry: GeometryEntry) -> ShellResult<()> {
        self.update(category, |current| *current = entry)
    }

    /// Read-modify-write of one bucket followed by a full, synchronous flush.
    /// The change becomes visible only once the flush succeeded.
    pub fn update<F>(&self, category: WindowCategory, f: F) -> ShellResult<()>
    where
        F: FnOnce(&mut GeometryEntry),
    {
        let mut record = self.record.write();
        let mut next = record.clone();
        f(next.geometry_mut(category));
        self.backend.set_all(&next)?;
        *record = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default, Clone)]
    struct MemoryBackend {
        stored: Arc<Mutex<Option<SettingsRecord>>>,
        writes: Arc<Mutex<usize>>,
    }

    impl SettingsBackend for MemoryBackend {
        fn load_all(&self) -> ShellResult<Option<SettingsRecord>> {
            Ok(self.stored.lock().clone())
        }

        fn set_all(&self, record: &SettingsRecord) -> ShellResult<()> {
            *self.stored.lock() = Some(record.clone());
            *self.writes.lock() += 1;
            Ok(())
        }
    }

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);
        let store = SettingsStore::load(JsonFileBackend::new(&path)).expect("load");

        assert_eq!(store.record(), SettingsRecord::default());
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn unchecked_record_is_reset() {
        let backend = MemoryBackend::default();
        let mut stale = SettingsRecord::default();
        stale.check = false;
        stale.client.width = 1;
        *backend.stored.lock() = Some(stale);

        let store = SettingsStore::load(backend.clone()).expect("load");
        assert_eq!(store.category(WindowCategory::Client).width, 1280);
        assert_eq!(*backend.writes.lock(), 1);
    }

    #[test]
    fn every_update_flushes_once() {
        let backend = MemoryBackend::default();
        let store = SettingsStore::load(backend.clone()).expect("load");
        let before = *backend.writes.lock();

        store
            .update(WindowCategory::Game, |g| g.width = 1920)
            .expect("update");
        store
            .update(WindowCategory::Game, |g| g.height = 1080)
            .expect("update");

        assert_eq!(*backend.writes.lock(), before + 2);
        let stored = backend.stored.lock().clone().expect("stored");
        assert_eq!(stored.game.width, 1920);
        assert_eq!(stored.game.height, 1080);
    }

    #[test]
    fn reload_returns_written_geometry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let entry = GeometryEntry {
            width: 1366,
            height: 705,
            x: -1366,
            y: 12,
            maximized: true,
        };

        let store = SettingsStore::load(JsonFileBackend::new(&path)).expect("load");
        store
            .set_category(WindowCategory::Config, entry)
            .expect("set");
        drop(store);

        let reloaded = SettingsStore::load(JsonFileBackend::new(&path)).expect("reload");
        assert_eq!(reloaded.category(WindowCategory::Config), entry);
        assert_eq!(
            reloaded.category(WindowCategory::Client),
            SettingsRecord::default().client
        );
    }

    #[test]
    fn corrupt_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, b"{ not json").expect("write");

        let err = SettingsStore::load(JsonFileBackend::new(&path))
            .err()
            .expect("corrupt file must fail");
        assert!(matches!(err, ShellError::PersistenceRead { .. }));
    }

    #[test]
    fn write_failure_is_surfaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the file should be makes the final rename fail.
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let store = SettingsStore::with_defaults(JsonFileBackend::new(&path));
        fs::create_dir_all(path.join("occupied")).expect("mkdir");

        let before = store.category(WindowCategory::Client);

        let err = store
            .update(WindowCategory::Client, |c| c.x = 5)
            .expect_err("write must fail");
        assert!(matches!(err, ShellError::PersistenceWrite { .. }));
        assert_eq!(store.category(WindowCategory::Client), before);
        assert_eq!(store.record(), SettingsRecord::default());
    }

    #[test]
    fn failed_write_leaves_live_file_intact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let store = SettingsStore::load(JsonFileBackend::new(&path)).expect("load");
        store
            .update(WindowCategory::Game, |g| g.width = 1440)
            .expect("update");
        let on_disk = fs::read(&path).expect("read");

        // Occupy the temp path so the next flush cannot even start.
        fs::create_dir_all(path.with_extension("tmp").join("occupied")).expect("mkdir");
        store
            .update(WindowCategory::Game, |g| g.width = 1)
            .expect_err("write must fail");

        assert_eq!(fs::read(&path).expect("read"), on_disk);
        assert_eq!(store.category(WindowCategory::Game).width, 1440);
        let reloaded = SettingsStore::load(JsonFileBackend::new(&path)).expect("reload");
        assert_eq!(reloaded.category(WindowCategory::Game).width, 1440);
    }

    #[test]
    fn rewrite_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let store = SettingsStore::load(JsonFileBackend::new(&path)).expect("load");
        for width in [800, 900, 1000] {
            store
                .update(WindowCategory::Board, |b| b.width = width)
                .expect("update");
        }

        let stored: SettingsRecord =
            serde_json::from_slice(&fs::read(&path).expect("read")).expect("parse");
        assert_eq!(stored.board.width, 1000);
        assert!(!path.with_extension("tmp").exists());
    }
}
