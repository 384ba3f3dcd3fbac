use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use opline_journal::{Journal, MergedEntry};
use opline_types::Record;

use crate::error::{StoreError, StoreResult};

/// Suffix of session files subject to rotation.
pub const AUTOSAVE_SUFFIX: &str = "-logfile-A.txt";
/// Suffix of manual exports, exempt from rotation.
pub const EXPORT_SUFFIX: &str = "-logfile-M.txt";

/// Log store settings, provided by configuration outside the core.
///
/// `auto_save_limit = 0` disables retention beyond the current session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    pub log_dir: PathBuf,
    pub auto_save_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            auto_save_limit: 5,
        }
    }
}

/// Durable, human-readable mirror of the journal.
///
/// Opening a store creates the log directory if needed (pre-existence is not
/// an error), rotates old autosaves down to the configured limit, and starts
/// a fresh session file named with the creation epoch.
pub struct LogStore {
    config: StoreConfig,
    session_path: PathBuf,
}

impl LogStore {
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        if config.log_dir.as_os_str().is_empty() {
            return Err(StoreError::InvalidPath(config.log_dir));
        }
        let existed = config.log_dir.is_dir();
        fs::create_dir_all(&config.log_dir)?;
        if !existed {
            info!(dir = %config.log_dir.display(), "created log directory");
        }

        let deleted = Self::enforce_autosave_limit(&config.log_dir, config.auto_save_limit)?;
        if deleted > 0 {
            info!(deleted, limit = config.auto_save_limit, "rotated old autosave files");
        }

        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let session_path = config.log_dir.join(format!("{epoch}{AUTOSAVE_SUFFIX}"));

        let store = Self {
            config,
            session_path,
        };
        // Start the session file with its date header so that even an idle
        // session leaves a well-formed log behind.
        if !store.session_path.exists() {
            let mut file = File::create(&store.session_path)?;
            writeln!(file, "{}", Self::date_header())?;
        }
        debug!(session = %store.session_path.display(), "log session started");
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the current session's autosave file.
    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Rewrite the target file from scratch: date header, then the full
    /// merge-ordered journal, one line per record. Fails with a typed error
    /// on an unusable path; it never panics on caller input.
    pub fn write_full(&self, path: &Path, journal: &Journal) -> StoreResult<()> {
        Self::validate_path(path)?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", Self::date_header())?;
        for entry in journal.iter_merged() {
            writeln!(writer, "{}", Self::format_entry(&entry))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rewrite the current session file from the journal.
    pub fn write_session_full(&self, journal: &Journal) -> StoreResult<()> {
        self.write_full(&self.session_path, journal)
    }

    /// Append exactly one formatted record line, creating the file first if
    /// it does not exist. Never re-truncates an existing file.
    pub fn append_record(&self, path: &Path, record: &Record) -> StoreResult<()> {
        Self::validate_path(path)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", Self::format_record(record))?;
        Ok(())
    }

    /// Append one record to the current session file.
    pub fn append_session_record(&self, record: &Record) -> StoreResult<()> {
        self.append_record(&self.session_path, record)
    }

    /// Append the full merge-ordered journal (dump mode), creating the file
    /// first if needed.
    pub fn append_merged(&self, path: &Path, journal: &Journal) -> StoreResult<()> {
        Self::validate_path(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for entry in journal.iter_merged() {
            writeln!(writer, "{}", Self::format_entry(&entry))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Append the full merge-ordered journal to the current session file.
    pub fn append_session_merged(&self, journal: &Journal) -> StoreResult<()> {
        self.append_merged(&self.session_path, journal)
    }

    /// Write a manual export of the journal. Exports use their own suffix
    /// and are never counted or deleted by rotation.
    pub fn export(&self, journal: &Journal) -> StoreResult<PathBuf> {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = self.config.log_dir.join(format!("{epoch}{EXPORT_SUFFIX}"));
        self.write_full(&path, journal)?;
        info!(path = %path.display(), "journal exported");
        Ok(path)
    }

    /// Delete oldest autosave files (by modification time) until at most
    /// `limit` remain. Bounded: at most `count - limit` deletions. Files
    /// without the autosave suffix are never candidates.
    fn enforce_autosave_limit(dir: &Path, limit: usize) -> StoreResult<usize> {
        let mut autosaves: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_autosave = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(AUTOSAVE_SUFFIX));
            if !is_autosave || !path.is_file() {
                continue;
            }
            let modified = entry
                .metadata()?
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            autosaves.push((modified, path));
        }

        if autosaves.len() <= limit {
            return Ok(0);
        }

        // Oldest first; equal mtimes fall back to the numeric epoch prefix
        // rather than the lexicographic path.
        autosaves.sort_by_key(|(modified, path)| (*modified, Self::epoch_prefix(path)));
        let excess = autosaves.len() - limit;
        let mut deleted = 0;
        for (_, path) in autosaves.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "deleted old autosave");
                    deleted += 1;
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "failed to delete old autosave");
                }
            }
        }
        Ok(deleted)
    }

    /// Creation epoch parsed from an autosave filename; unparseable names
    /// sort last so they are deleted after any well-formed file.
    fn epoch_prefix(path: &Path) -> u64 {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(AUTOSAVE_SUFFIX))
            .and_then(|prefix| prefix.parse().ok())
            .unwrap_or(u64::MAX)
    }

    fn validate_path(path: &Path) -> StoreResult<()> {
        let text = path.to_string_lossy();
        if text.trim().is_empty() || path.file_name().is_none() {
            return Err(StoreError::InvalidPath(path.to_path_buf()));
        }
        Ok(())
    }

    /// `"====== MM/DD/YYYY ======"`
    fn date_header() -> String {
        format!("====== {} ======", chrono::Local::now().format("%m/%d/%Y"))
    }

    fn format_entry(entry: &MergedEntry<'_>) -> String {
        Self::format_record(&entry.to_record())
    }

    /// `"ID: {id} {timestamp} {text}"`, with a cleared marker for errors.
    fn format_record(record: &Record) -> String {
        let base = format!(
            "ID: {} {} {}",
            record.id(),
            record.timestamp(),
            record.text()
        );
        match record {
            Record::Event(_) => base,
            Record::Error(e) if e.cleared => format!("{base}, CLEARED"),
            Record::Error(_) => format!("{base}, NOT CLEARED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opline_types::{ErrorRecord, EventRecord};
    use std::time::Duration;

    fn config(dir: &Path, limit: usize) -> StoreConfig {
        StoreConfig {
            log_dir: dir.to_path_buf(),
            auto_save_limit: limit,
        }
    }

    fn sample_journal() -> Journal {
        let mut journal = Journal::new();
        journal.add_event(EventRecord::new(3, "10:00:00", "startup"));
        journal.add_error(ErrorRecord::new(5, "10:00:01", "sensor fault", false));
        journal.add_error(ErrorRecord::new(7, "10:00:02", "overvoltage", true));
        journal
    }

    fn touch_autosave(dir: &Path, epoch: u64, age: Duration) {
        let path = dir.join(format!("{epoch}{AUTOSAVE_SUFFIX}"));
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn open_creates_directory_and_session_header() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        let store = LogStore::open(config(&dir, 5)).unwrap();

        assert!(dir.is_dir());
        let content = fs::read_to_string(store.session_path()).unwrap();
        assert!(content.starts_with("====== "));
        assert!(content.trim_end().ends_with(" ======"));

        // Re-opening over an existing directory is not an error.
        LogStore::open(config(&dir, 5)).unwrap();
    }

    #[test]
    fn session_file_uses_autosave_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::open(config(tmp.path(), 5)).unwrap();
        let name = store.session_path().file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(AUTOSAVE_SUFFIX));
        let prefix = name.strip_suffix(AUTOSAVE_SUFFIX).unwrap();
        prefix.parse::<u64>().expect("epoch prefix");
    }

    #[test]
    fn write_full_truncates_and_formats() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::open(config(tmp.path(), 5)).unwrap();
        let journal = sample_journal();
        let path = tmp.path().join("out.txt");

        store.write_full(&path, &journal).unwrap();
        store.write_full(&path, &journal).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // One header plus three records: a rewrite, not an append.
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "ID: 3 10:00:00 startup");
        assert_eq!(lines[2], "ID: 5 10:00:01 sensor fault, NOT CLEARED");
        assert_eq!(lines[3], "ID: 7 10:00:02 overvoltage, CLEARED");
    }

    #[test]
    fn append_record_creates_then_preserves() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::open(config(tmp.path(), 5)).unwrap();
        let path = tmp.path().join("live.txt");

        let event = Record::Event(EventRecord::new(1, "t", "first"));
        store.append_record(&path, &event).unwrap();
        let error = Record::Error(ErrorRecord::new(2, "t", "second", false));
        store.append_record(&path, &error).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["ID: 1 t first", "ID: 2 t second, NOT CLEARED"]);
    }

    #[test]
    fn append_merged_keeps_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::open(config(tmp.path(), 5)).unwrap();
        let journal = sample_journal();

        store.append_session_merged(&journal).unwrap();
        let content = fs::read_to_string(store.session_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // Header from open() still present, then the merged dump.
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("======"));
    }

    #[test]
    fn rotation_deletes_exactly_the_oldest() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..6u64 {
            touch_autosave(tmp.path(), 1_000 + i, Duration::from_secs(600 - i * 60));
        }
        // A manual export and an unrelated file must never be candidates.
        fs::write(tmp.path().join(format!("999{EXPORT_SUFFIX}")), "x").unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let _store = LogStore::open(config(tmp.path(), 5)).unwrap();

        // Oldest (epoch 1000) is gone; the other five survive.
        assert!(!tmp.path().join(format!("1000{AUTOSAVE_SUFFIX}")).exists());
        for i in 1..6u64 {
            assert!(tmp
                .path()
                .join(format!("{}{AUTOSAVE_SUFFIX}", 1_000 + i))
                .exists());
        }
        assert!(tmp.path().join(format!("999{EXPORT_SUFFIX}")).exists());
        assert!(tmp.path().join("notes.txt").exists());
    }

    #[test]
    fn rotation_tie_breaks_on_numeric_epoch() {
        let tmp = tempfile::tempdir().unwrap();
        // Identical mtimes; 999 is numerically older than 1000 even though
        // it sorts after it lexicographically.
        let stamp = SystemTime::now() - Duration::from_secs(300);
        for epoch in [999u64, 1000] {
            let path = tmp.path().join(format!("{epoch}{AUTOSAVE_SUFFIX}"));
            let file = File::create(&path).unwrap();
            file.set_modified(stamp).unwrap();
        }

        let _store = LogStore::open(config(tmp.path(), 1)).unwrap();

        assert!(!tmp.path().join(format!("999{AUTOSAVE_SUFFIX}")).exists());
        assert!(tmp.path().join(format!("1000{AUTOSAVE_SUFFIX}")).exists());
    }

    #[test]
    fn zero_limit_drops_all_prior_autosaves() {
        let tmp = tempfile::tempdir().unwrap();
        touch_autosave(tmp.path(), 100, Duration::from_secs(120));
        touch_autosave(tmp.path(), 200, Duration::from_secs(60));

        let store = LogStore::open(config(tmp.path(), 0)).unwrap();

        assert!(!tmp.path().join(format!("100{AUTOSAVE_SUFFIX}")).exists());
        assert!(!tmp.path().join(format!("200{AUTOSAVE_SUFFIX}")).exists());
        assert!(store.session_path().exists());
    }

    #[test]
    fn unusable_paths_fail_without_panicking() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::open(config(tmp.path(), 5)).unwrap();
        let journal = sample_journal();

        let err = store.write_full(Path::new(""), &journal).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));

        let err = store.write_full(Path::new("/"), &journal).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));

        // Missing directory component: an I/O failure, not a panic.
        let missing = tmp.path().join("no_such_dir").join("file.txt");
        let err = store.write_full(&missing, &journal).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn export_is_rotation_exempt_and_complete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::open(config(tmp.path(), 5)).unwrap();
        let journal = sample_journal();

        let path = store.export(&journal).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(EXPORT_SUFFIX));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
