use crate::{error::Result, store::ProfileStore};
use std::{fs, path::PathBuf};
use time::{macros::format_description, OffsetDateTime};

/// Copies a profile file that failed to parse into `backups/` so a later save
/// cannot destroy it. Returns `None` when there is nothing left to preserve.
pub fn preserve_corrupt(store: &ProfileStore, profile: &str) -> Result<Option<PathBuf>> {
    let source = store.profile_path(profile);
    if !source.exists() {
        return Ok(None);
    }

    let backup_root = store.dir().join("backups");
    fs::create_dir_all(&backup_root)?;
    let stamp = backup_timestamp();
    let mut target = backup_root.join(format!("{profile}-{stamp}.json.corrupt"));
    let mut attempt = 2;
    while target.exists() {
        target = backup_root.join(format!("{profile}-{stamp}-{attempt}.json.corrupt"));
        attempt += 1;
    }
    fs::copy(&source, &target)?;
    log::warn!(
        "Preserved corrupt profile data: {} -> {}",
        source.display(),
        target.display()
    );
    Ok(Some(target))
}

fn backup_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .unwrap_or_else(|_| "unknown".to_string())
}
