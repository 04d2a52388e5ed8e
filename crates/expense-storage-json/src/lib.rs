use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use expense_core::{storage::UserStore, CoreError};
use expense_domain::User;
use tracing::{debug, warn};
use uuid::Uuid;

const DOCUMENT_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Filesystem-backed JSON persistence for user documents and their backups.
#[derive(Debug, Clone)]
pub struct JsonUserStorage {
    users_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

/// A rotated copy of a previously stored user document.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupInfo {
    pub username: String,
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub path: PathBuf,
}

impl JsonUserStorage {
    pub fn new(users_dir: PathBuf, backups_dir: PathBuf) -> Result<Self, CoreError> {
        Self::with_retention(users_dir, backups_dir, DEFAULT_RETENTION)
    }

    pub fn with_retention(
        users_dir: PathBuf,
        backups_dir: PathBuf,
        retention: usize,
    ) -> Result<Self, CoreError> {
        fs::create_dir_all(&users_dir)?;
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            users_dir,
            backups_dir,
            retention: retention.max(1),
        })
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn user_path(&self, username: &str) -> PathBuf {
        self.users_dir
            .join(format!("{}.{}", canonical_name(username), DOCUMENT_EXTENSION))
    }

    /// Backups of a user's document, newest first.
    pub fn list_backups(&self, username: &str) -> Result<Vec<BackupInfo>, CoreError> {
        let dir = self.backup_dir(username);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let slug = canonical_name(username);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                let stamp = parse_backup_stamp(file_name);
                entries.push((
                    stamp.map(|(_, sequence)| sequence).unwrap_or(0),
                    BackupInfo {
                        username: slug.clone(),
                        id: file_name.to_string(),
                        created_at: stamp.map(|(created_at, _)| created_at),
                        path: path.clone(),
                    },
                ));
            }
        }
        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            Reverse((a.created_at, *seq_a))
                .cmp(&Reverse((b.created_at, *seq_b)))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries.into_iter().map(|(_, info)| info).collect())
    }

    fn backup_dir(&self, username: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(username))
    }

    fn save_document(&self, user: &User) -> Result<(), CoreError> {
        let path = self.user_path(&user.username);
        if path.exists() {
            self.backup_existing_file(&user.username, &path)?;
        }
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &serialize_user(user)?)?;
        fs::rename(&tmp, &path)?;
        debug!(username = %user.username, path = %path.display(), "user document written");
        Ok(())
    }

    fn backup_existing_file(&self, username: &str, path: &Path) -> Result<(), CoreError> {
        let dir = self.backup_dir(username);
        fs::create_dir_all(&dir)?;
        let slug = canonical_name(username);
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut target = dir.join(format!("{slug}_{timestamp}.{DOCUMENT_EXTENSION}"));
        // Several writes within one second get a numbered suffix.
        let mut sequence = 1;
        while target.exists() {
            target = dir.join(format!("{slug}_{timestamp}-{sequence}.{DOCUMENT_EXTENSION}"));
            sequence += 1;
        }
        fs::copy(path, &target)?;
        self.prune_backups(username)
    }

    fn prune_backups(&self, username: &str) -> Result<(), CoreError> {
        for entry in self.list_backups(username)?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                warn!(backup = %entry.id, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }

    fn document_paths(&self) -> Result<Vec<PathBuf>, CoreError> {
        if !self.users_dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.users_dir)? {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl UserStore for JsonUserStorage {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, CoreError> {
        let path = self.user_path(username);
        if !path.exists() {
            return Ok(None);
        }
        load_user_from_path(&path).map(Some)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CoreError> {
        for path in self.document_paths()? {
            let user = load_user_from_path(&path)?;
            if user.id == id {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    fn insert_user(&self, user: &User) -> Result<(), CoreError> {
        if self.user_path(&user.username).exists() {
            return Err(CoreError::UsernameTaken(user.username.clone()));
        }
        self.save_document(user)
    }

    fn update_user(&self, user: &User) -> Result<(), CoreError> {
        let path = self.user_path(&user.username);
        if !path.exists() {
            return Err(CoreError::UserNotFound(user.username.clone()));
        }
        let stored = load_user_from_path(&path)?;
        if stored.id != user.id {
            return Err(CoreError::Storage(format!(
                "document `{}` belongs to a different user",
                path.display()
            )));
        }
        self.save_document(user)
    }
}

/// Loads a user document from the provided filesystem path.
pub fn load_user_from_path(path: &Path) -> Result<User, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| {
        CoreError::Serde(format!("{}: {}", path.display(), err))
    })
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
        "user".into()
    } else {
        sanitized
    }
}

/// Reads `<slug>_<YYYYmmdd>_<HHMMSS>[-n].json` into its timestamp and sequence.
/// Minute-resolution names (`HHMM`) from older builds are still understood.
fn parse_backup_stamp(name: &str) -> Option<(DateTime<Utc>, u32)> {
    let trimmed = name.strip_suffix(&format!(".{}", DOCUMENT_EXTENSION))?;
    let mut segments = trimmed.rsplit('_');
    let last = segments.next()?;
    let date = segments.next()?;
    let (time, sequence) = match last.split_once('-') {
        Some((time, sequence)) if is_digits(sequence) => (time, sequence.parse().ok()?),
        Some(_) => return None,
        None => (last, 0),
    };
    if date.len() != 8 || !is_digits(date) || !is_digits(time) {
        return None;
    }
    let format = match time.len() {
        6 => "%Y%m%d%H%M%S",
        4 => "%Y%m%d%H%M",
        _ => return None,
    };
    NaiveDateTime::parse_from_str(&format!("{}{}", date, time), format)
        .ok()
        .map(|naive| (naive.and_utc(), sequence))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
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

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn serialize_user(user: &User) -> Result<String, CoreError> {
    serde_json::to_string_pretty(user).map_err(|err| CoreError::Serde(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_folds_case_and_symbols() {
        assert_eq!(canonical_name(" Alice "), "alice");
        assert_eq!(canonical_name("bob.smith"), "bob_smith");
        assert_eq!(canonical_name("..."), "user");
    }

    #[test]
    fn backup_stamp_is_read_from_file_name() {
        let (parsed, sequence) =
            parse_backup_stamp("alice_20240315_093012.json").expect("timestamp");
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-15 09:30:12");
        assert_eq!(sequence, 0);

        let (repeat, sequence) =
            parse_backup_stamp("alice_20240315_093012-2.json").expect("numbered");
        assert_eq!(repeat, parsed);
        assert_eq!(sequence, 2);

        let (legacy, _) = parse_backup_stamp("alice_20240315_0930.json").expect("legacy");
        assert_eq!(legacy.format("%H:%M:%S").to_string(), "09:30:00");

        assert!(parse_backup_stamp("alice.json").is_none());
        assert!(parse_backup_stamp("alice_2024_0930.json").is_none());
        assert!(parse_backup_stamp("alice_20240315_093012-x.json").is_none());
    }

    #[test]
    fn tmp_path_keeps_original_extension() {
        let tmp = tmp_path(Path::new("/data/users/alice.json"));
        assert_eq!(tmp, PathBuf::from("/data/users/alice.json.tmp"));
    }
}
