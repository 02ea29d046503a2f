use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tauri::{AppHandle, Manager, Runtime};

const LOG_FILE_NAME: &str = "app.log.jsonl";
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
const MAX_ROTATIONS: usize = 3;

/// Held for rotation and the append that follows it.
static LOG_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppLogRecord {
    pub ts_ms: i64,
    pub level: String,
    pub scope: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl AppLogRecord {
    pub fn new(level: &str, scope: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            ts_ms: Utc::now().timestamp_millis(),
            level: level.to_string(),
            scope: scope.to_string(),
            message: message.into(),
            data,
        }
    }
}

fn log_dir<R: Runtime>(app: &AppHandle<R>) -> Result<PathBuf, String> {
    app.path()
        .app_log_dir()
        .map_err(|e| format!("Failed to resolve log dir: {}", e))
}

/// Live log plus its numbered predecessors, `app.log.1.jsonl` being the newest.
struct LogFiles<'a> {
    dir: &'a Path,
}

impl LogFiles<'_> {
    fn live(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    fn rotated(&self, index: usize) -> PathBuf {
        self.dir.join(format!("app.log.{}.jsonl", index))
    }

    fn needs_rotation(&self, max_bytes: u64) -> bool {
        fs::metadata(self.live()).is_ok_and(|meta| meta.len() >= max_bytes)
    }

    /// Shifts every file one slot up; whatever falls off the end is deleted.
    fn rotate(&self) -> Result<(), String> {
        let mut slots: Vec<PathBuf> = (1..=MAX_ROTATIONS).map(|i| self.rotated(i)).collect();
        slots.insert(0, self.live());

        let dropped = &slots[MAX_ROTATIONS];
        if dropped.exists() {
            fs::remove_file(dropped)
                .map_err(|e| format!("Failed to drop {}: {}", dropped.display(), e))?;
        }
        for pair in slots.windows(2).rev() {
            let (from, to) = (&pair[0], &pair[1]);
            if from.exists() {
                fs::rename(from, to)
                    .map_err(|e| format!("Failed to rotate {}: {}", from.display(), e))?;
            }
        }
        Ok(())
    }
}

fn append_to_dir(dir: &Path, record: &AppLogRecord, max_bytes: u64) -> Result<(), String> {
    let line = serde_json::to_string(record)
        .map_err(|e| format!("Failed to serialize log record: {}", e))?;
    let files = LogFiles { dir };

    let _guard = LOG_LOCK.lock();
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create log dir: {}", e))?;
    if files.needs_rotation(max_bytes) {
        files.rotate()?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(files.live())
        .map_err(|e| format!("Failed to open log file: {}", e))?;
    writeln!(file, "{}", line).map_err(|e| format!("Failed to write log record: {}", e))
}

pub fn append<R: Runtime>(app: &AppHandle<R>, record: AppLogRecord) -> Result<(), String> {
    let dir = log_dir(app)?;
    append_to_dir(&dir, &record, MAX_LOG_BYTES)
}

pub fn info<R: Runtime>(app: &AppHandle<R>, scope: &str, message: &str) -> Result<(), String> {
    append(app, AppLogRecord::new("info", scope, message, None))
}

pub fn warn<R: Runtime>(
    app: &AppHandle<R>,
    scope: &str,
    message: &str,
    data: Value,
) -> Result<(), String> {
    append(app, AppLogRecord::new("warn", scope, message, Some(data)))
}

pub fn error<R: Runtime>(
    app: &AppHandle<R>,
    scope: &str,
    message: &str,
    data: Value,
) -> Result<(), String> {
    append(app, AppLogRecord::new("error", scope, message, Some(data)))
}

pub fn install_panic_hook<R: Runtime>(app: AppHandle<R>) {
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "panic".to_string()
        };
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());

        let _ = append(
            &app,
            AppLogRecord::new("error", "panic", format!("{} ({})", payload, location), None),
        );

        prev(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_records(path: &Path) -> Vec<AppLogRecord> {
        fs::read_to_string(path)
            .expect("read log")
            .lines()
            .map(|l| serde_json::from_str(l).expect("parse record"))
            .collect()
    }

    #[test]
    fn appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let record = AppLogRecord::new(
            "info",
            "navigation",
            "open_window",
            Some(serde_json::json!({ "category": "board" })),
        );
        append_to_dir(dir.path(), &record, MAX_LOG_BYTES).expect("append");
        append_to_dir(
            dir.path(),
            &AppLogRecord::new("warn", "settings", "defaults", None),
            MAX_LOG_BYTES,
        )
        .expect("append");

        let records = read_records(&LogFiles { dir: dir.path() }.live());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scope, "navigation");
        assert_eq!(records[0].data.as_ref().map(|d| d["category"].clone()), Some(serde_json::json!("board")));
        assert!(records[1].data.is_none());
    }

    #[test]
    fn rotation_keeps_a_bounded_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..(MAX_ROTATIONS + 3) {
            let record = AppLogRecord::new("info", "app", format!("line-{}", i), None);
            append_to_dir(dir.path(), &record, 1).expect("append");
        }

        let files = LogFiles { dir: dir.path() };
        assert!(files.rotated(MAX_ROTATIONS).exists());
        assert!(!files.rotated(MAX_ROTATIONS + 1).exists());
        let newest = read_records(&files.live());
        assert_eq!(newest[0].message, format!("line-{}", MAX_ROTATIONS + 2));
        let previous = read_records(&files.rotated(1));
        assert_eq!(previous[0].message, format!("line-{}", MAX_ROTATIONS + 1));
    }

    #[test]
    fn rotates_when_file_exceeds_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let record = AppLogRecord::new("info", "app", "startup", None);
        append_to_dir(dir.path(), &record, 1).expect("first");
        append_to_dir(dir.path(), &record, 1).expect("second");

        let files = LogFiles { dir: dir.path() };
        assert!(files.rotated(1).exists());
        assert_eq!(read_records(&files.live()).len(), 1);
    }
}
