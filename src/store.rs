use crate::{
    error::{Result, ShelfError},
    record::GameRecord,
};
use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

pub const DEFAULT_PROFILE: &str = "Default";
const PROFILE_EXT: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    /// The file was missing; an empty one was written in its place.
    Created,
    /// The file could not be parsed. It was left untouched on disk.
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub struct LoadedRecords {
    pub records: Vec<GameRecord>,
    pub status: LoadStatus,
}

/// One JSON file per profile under a single directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{PROFILE_EXT}"))
    }

    pub fn list_profiles(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(PROFILE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        Ok(self.list_profiles()?.iter().any(|profile| profile == name))
    }

    /// Creates an empty profile and returns its normalized name.
    pub fn create_profile(&self, name: &str) -> Result<String> {
        let name = normalize_profile_name(name)?;
        if self
            .list_profiles()?
            .iter()
            .any(|profile| profile.to_lowercase() == name.to_lowercase())
        {
            return Err(ShelfError::DuplicateName(name));
        }
        self.save_records(&name, &[])?;
        log::info!("Profile created: {name}");
        Ok(name)
    }

    pub fn delete_profile(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name == DEFAULT_PROFILE {
            return Err(ShelfError::Protected(name.to_string()));
        }
        if !self.exists(name)? {
            return Err(ShelfError::NotFound(name.to_string()));
        }
        fs::remove_file(self.profile_path(name))?;
        log::info!("Profile deleted: {name}");
        Ok(())
    }

    /// Writes an empty `Default` profile when no profile exists yet.
    pub fn ensure_default(&self) -> Result<bool> {
        if !self.list_profiles()?.is_empty() {
            return Ok(false);
        }
        self.save_records(DEFAULT_PROFILE, &[])?;
        log::info!("Created {DEFAULT_PROFILE} profile");
        Ok(true)
    }

    pub fn load_records(&self, name: &str) -> Result<LoadedRecords> {
        let path = self.profile_path(name);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::warn!("Profile file missing, recreating: {}", path.display());
                if let Err(err) = self.save_records(name, &[]) {
                    log::error!("Failed to recreate profile file {}: {err}", path.display());
                }
                return Ok(LoadedRecords {
                    records: Vec::new(),
                    status: LoadStatus::Created,
                });
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<Vec<GameRecord>>(&raw) {
            Ok(records) => {
                log::info!("Loaded {} game(s) from profile {name}", records.len());
                Ok(LoadedRecords {
                    records,
                    status: LoadStatus::Loaded,
                })
            }
            Err(err) => {
                log::warn!("Profile data is corrupt: {} ({err})", path.display());
                Ok(LoadedRecords {
                    records: Vec::new(),
                    status: LoadStatus::Corrupt(err.to_string()),
                })
            }
        }
    }

    pub fn save_records(&self, name: &str, records: &[GameRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string_pretty(records)?;
        write_atomic(&self.profile_path(name), &raw)?;
        log::debug!("Saved {} game(s) to profile {name}", records.len());
        Ok(())
    }
}

pub fn normalize_profile_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty()
        || name.starts_with('.')
        || name.chars().any(|ch| matches!(ch, '/' | '\\') || ch.is_control())
    {
        return Err(ShelfError::InvalidName(name.to_string()));
    }
    Ok(name.to_string())
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().unwrap_or_default();
    let mut temp_name = OsString::from(file_name);
    temp_name.push(".tmp");
    let temp_path = parent.join(temp_name);
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GameDraft, GameStatus};
    use tempfile::TempDir;

    fn store() -> (TempDir, ProfileStore) {
        let tmp = TempDir::new().unwrap();
        let store = ProfileStore::new(tmp.path().join("profiles"));
        (tmp, store)
    }

    fn game(title: &str, platform: &str, genre: &str, status: GameStatus) -> GameRecord {
        GameDraft::new(title, platform, genre, status)
            .into_record()
            .unwrap()
    }

    #[test]
    fn list_creates_missing_directory() {
        let (_tmp, store) = store();
        assert!(!store.dir().exists());
        assert!(store.list_profiles().unwrap().is_empty());
        assert!(store.dir().is_dir());
    }

    #[test]
    fn list_is_sorted_and_ignores_other_files() {
        let (_tmp, store) = store();
        store.create_profile("Retro").unwrap();
        store.create_profile("Arcade").unwrap();
        fs::write(store.dir().join("notes.txt"), "x").unwrap();
        fs::write(store.dir().join("Retro.json.tmp"), "[]").unwrap();
        fs::create_dir_all(store.dir().join("backups")).unwrap();
        assert_eq!(store.list_profiles().unwrap(), vec!["Arcade", "Retro"]);
    }

    #[test]
    fn create_lists_name_once_and_rejects_duplicates() {
        let (_tmp, store) = store();
        assert_eq!(store.create_profile("  Arcade ").unwrap(), "Arcade");
        let names = store.list_profiles().unwrap();
        assert_eq!(names.iter().filter(|name| *name == "Arcade").count(), 1);

        let err = store.create_profile("Arcade").unwrap_err();
        assert!(matches!(err, ShelfError::DuplicateName(name) if name == "Arcade"));
        let err = store.create_profile("arcade").unwrap_err();
        assert!(matches!(err, ShelfError::DuplicateName(_)));
    }

    #[test]
    fn create_rejects_invalid_names() {
        let (_tmp, store) = store();
        for name in ["", "   ", "../escape", "a/b", "a\\b", ".hidden"] {
            let err = store.create_profile(name).unwrap_err();
            assert!(matches!(err, ShelfError::InvalidName(_)), "{name:?}");
        }
        assert!(store.list_profiles().unwrap().is_empty());
    }

    #[test]
    fn default_profile_is_protected() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.delete_profile(DEFAULT_PROFILE),
            Err(ShelfError::Protected(_))
        ));
        store.ensure_default().unwrap();
        assert!(matches!(
            store.delete_profile(DEFAULT_PROFILE),
            Err(ShelfError::Protected(_))
        ));
        assert!(store.exists(DEFAULT_PROFILE).unwrap());
    }

    #[test]
    fn delete_trims_name_like_create() {
        let (_tmp, store) = store();
        store.ensure_default().unwrap();
        store.create_profile(" Arcade ").unwrap();
        assert!(store.exists("  Arcade").unwrap());
        assert!(matches!(
            store.delete_profile(" Default "),
            Err(ShelfError::Protected(name)) if name == DEFAULT_PROFILE
        ));
        store.delete_profile(" Arcade ").unwrap();
        assert!(!store.profile_path("Arcade").exists());
    }

    #[test]
    fn delete_removes_file_or_reports_missing() {
        let (_tmp, store) = store();
        store.create_profile("Arcade").unwrap();
        store.delete_profile("Arcade").unwrap();
        assert!(!store.profile_path("Arcade").exists());
        assert!(matches!(
            store.delete_profile("Arcade"),
            Err(ShelfError::NotFound(_))
        ));
    }

    #[test]
    fn ensure_default_only_when_empty() {
        let (_tmp, store) = store();
        assert!(store.ensure_default().unwrap());
        assert!(!store.ensure_default().unwrap());
        store.create_profile("Arcade").unwrap();
        assert_eq!(store.list_profiles().unwrap(), vec!["Arcade", "Default"]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_tmp, store) = store();
        let records = vec![
            game("Tetris", "GB", "", GameStatus::Owned),
            game("Okami", "PS2", "Action", GameStatus::Wishlisted),
        ];
        store.save_records("Arcade", &records).unwrap();
        let loaded = store.load_records("Arcade").unwrap();
        assert_eq!(loaded.status, LoadStatus::Loaded);
        assert_eq!(loaded.records, records);

        store.save_records("Arcade", &[]).unwrap();
        let loaded = store.load_records("Arcade").unwrap();
        assert!(loaded.records.is_empty());
        assert_eq!(loaded.status, LoadStatus::Loaded);
    }

    #[test]
    fn missing_file_is_recreated_empty() {
        let (_tmp, store) = store();
        let loaded = store.load_records("Ghost").unwrap();
        assert_eq!(loaded.status, LoadStatus::Created);
        assert!(loaded.records.is_empty());
        let raw = fs::read_to_string(store.profile_path("Ghost")).unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[test]
    fn corrupt_file_is_reported_and_left_untouched() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        let path = store.profile_path("Broken");
        fs::write(&path, "{ not json").unwrap();

        let loaded = store.load_records("Broken").unwrap();
        assert!(loaded.records.is_empty());
        assert!(matches!(loaded.status, LoadStatus::Corrupt(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn non_utf8_file_is_reported_as_corrupt() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        let path = store.profile_path("Arcade");
        fs::write(&path, [0x5b, 0xff, 0xfe, 0x5d]).unwrap();

        let loaded = store.load_records("Arcade").unwrap();
        assert!(loaded.records.is_empty());
        assert!(matches!(loaded.status, LoadStatus::Corrupt(_)));
        assert_eq!(fs::read(&path).unwrap(), vec![0x5b, 0xff, 0xfe, 0x5d]);
    }
}
