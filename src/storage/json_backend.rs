use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};

use crate::errors::{LedgerError, Result};

use super::KeyValueStore;

const VALUE_EXTENSION: &str = "json";
const BACKUP_DIR: &str = "backups";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Filesystem-backed store keeping one JSON file per key, with rolling
/// backups of previous values.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

/// A previous value of a key, kept under the backups directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub name: String,
    /// Local time the backup was taken, read back from its file name.
    pub created_at: Option<NaiveDateTime>,
    pub path: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        Self::with_retention(root, DEFAULT_RETENTION)
    }

    pub fn with_retention(root: PathBuf, retention: usize) -> Result<Self> {
        let backups_dir = root.join(BACKUP_DIR);
        fs::create_dir_all(&root)?;
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            root,
            backups_dir,
            retention: retention.max(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn value_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", canonical_name(key), VALUE_EXTENSION))
    }

    fn backup_dir(&self, key: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(key))
    }

    /// Lists the backups of `key`, newest first.
    pub fn list_backups(&self, key: &str) -> Result<Vec<BackupInfo>> {
        let dir = self.backup_dir(key);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(BackupInfo {
                    name: name.to_string(),
                    created_at: parse_backup_timestamp(name),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by_key(|entry| Reverse(backup_sort_key(&entry.name)));
        Ok(entries)
    }

    /// Copies a backup over the live value of `key` and returns its contents.
    pub fn restore_backup(&self, key: &str, backup_name: &str) -> Result<String> {
        if !is_plain_file_name(backup_name) {
            return Err(LedgerError::Storage(format!(
                "invalid backup name `{}`",
                backup_name
            )));
        }
        let backup_path = self.backup_dir(key).join(backup_name);
        if !backup_path.exists() {
            return Err(LedgerError::Storage(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        let data = fs::read_to_string(&backup_path)?;
        self.set(key, &data)?;
        tracing::info!(key, backup = backup_name, "restored backup");
        Ok(data)
    }

    fn backup_existing_file(&self, key: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(key);
        fs::create_dir_all(&dir)?;
        let timestamp = Local::now()
            .naive_local()
            .format(BACKUP_TIMESTAMP_FORMAT)
            .to_string();
        let stem = format!("{}_{}", canonical_name(key), timestamp);
        let mut backup_path = dir.join(format!("{}.{}", stem, VALUE_EXTENSION));
        let mut sequence = 1;
        // Several saves within one second get numbered suffixes.
        while backup_path.exists() {
            backup_path = dir.join(format!("{}-{}.{}", stem, sequence, VALUE_EXTENSION));
            sequence += 1;
        }
        fs::copy(path, &backup_path)?;
        self.prune_backups(key)?;
        Ok(())
    }

    fn prune_backups(&self, key: &str) -> Result<()> {
        let backups = self.list_backups(key)?;
        for entry in backups.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::warn!(path = %entry.path.display(), %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(key);
        self.backup_existing_file(key, &path)?;
        let tmp = tmp_path(&path);
        write_atomic(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(key, path = %path.display(), bytes = value.len(), "stored value");
        Ok(())
    }
}

/// Accepts only a single file name inside the backup directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "value".into()
    } else {
        sanitized
    }
}

fn parse_backup_timestamp(name: &str) -> Option<NaiveDateTime> {
    let trimmed = name.strip_suffix(&format!(".{}", VALUE_EXTENSION))?;
    let mut segments = trimmed.rsplitn(3, '_');
    let time = segments.next()?.split('-').next()?;
    let date = segments.next()?;
    if !is_digits(date, 8) || !is_digits(time, 6) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{}{}", date, time), "%Y%m%d%H%M%S").ok()
}

fn backup_sequence(name: &str) -> u32 {
    name.strip_suffix(&format!(".{}", VALUE_EXTENSION))
        .and_then(|stem| stem.rsplit_once('_'))
        .and_then(|(_, time)| time.split_once('-'))
        .and_then(|(_, sequence)| sequence.parse().ok())
        .unwrap_or(0)
}

fn backup_sort_key(name: &str) -> (Option<NaiveDateTime>, u32, String) {
    (
        parse_backup_timestamp(name),
        backup_sequence(name),
        name.to_string(),
    )
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_temp_dir(retention: usize) -> (JsonFileStore, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonFileStore::with_retention(temp.path().join("store"), retention)
            .expect("json store");
        (store, temp)
    }

    #[test]
    fn missing_key_reads_as_none() {
        let (store, _guard) = store_with_temp_dir(3);
        assert_eq!(store.get("expenses").unwrap(), None);
    }

    #[test]
    fn set_then_get_roundtrip() {
        let (store, _guard) = store_with_temp_dir(3);
        store.set("expenses", "[1,2]").unwrap();
        assert_eq!(store.get("expenses").unwrap().as_deref(), Some("[1,2]"));
        assert!(store.value_path("expenses").ends_with("expenses.json"));
        assert!(!tmp_path(&store.value_path("expenses")).exists());
    }

    #[test]
    fn overwrite_keeps_a_backup_of_the_previous_value() {
        let (store, _guard) = store_with_temp_dir(3);
        store.set("expenses", "[]").unwrap();
        store.set("expenses", "[1]").unwrap();
        let backups = store.list_backups("expenses").unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].name.starts_with("expenses_"));
        assert!(backups[0].created_at.is_some());
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "[]");
    }

    #[test]
    fn restore_backup_rejects_unknown_names() {
        let (store, _guard) = store_with_temp_dir(3);
        let err = store
            .restore_backup("expenses", "expenses_20000101_000000.json")
            .expect_err("unknown backup must fail");
        assert!(matches!(err, LedgerError::Storage(ref message) if message.contains("not found")));
    }

    #[test]
    fn restore_backup_rejects_paths_outside_the_backup_dir() {
        let (store, guard) = store_with_temp_dir(3);
        fs::write(guard.path().join("secret.json"), "[\"leak\"]").unwrap();
        for name in ["../../secret.json", "..", "nested/expenses.json", "..\\x.json", ""] {
            let err = store
                .restore_backup("expenses", name)
                .expect_err("path-like names must fail");
            assert!(matches!(err, LedgerError::Storage(ref message) if message.contains("invalid")));
        }
        assert_eq!(store.get("expenses").unwrap(), None);
    }

    #[test]
    fn backup_timestamps_parse_from_names() {
        let parsed = parse_backup_timestamp("my_key_20261019_140322.json").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2026-10-19 14:03:22");
        assert_eq!(parse_backup_timestamp("expenses.json"), None);
    }

    #[test]
    fn saves_within_one_second_keep_distinct_backups() {
        let (store, _guard) = store_with_temp_dir(5);
        store.set("expenses", "[]").unwrap();
        store.set("expenses", "[1]").unwrap();
        store.set("expenses", "[1,2]").unwrap();
        let backups = store.list_backups("expenses").unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "[1]");
        assert_eq!(fs::read_to_string(&backups[1].path).unwrap(), "[]");
    }

    #[test]
    fn numbered_backups_sort_after_their_base_name() {
        assert_eq!(backup_sequence("expenses_20261019_140322.json"), 0);
        assert_eq!(backup_sequence("expenses_20261019_140322-2.json"), 2);
        assert!(
            backup_sort_key("expenses_20261019_140322-1.json")
                > backup_sort_key("expenses_20261019_140322.json")
        );
        assert!(parse_backup_timestamp("expenses_20261019_140322-1.json").is_some());
    }

    #[test]
    fn canonical_names_are_filesystem_safe() {
        assert_eq!(canonical_name("Expenses"), "expenses");
        assert_eq!(canonical_name("../etc"), "___etc");
        assert_eq!(canonical_name("  "), "value");
    }
}
