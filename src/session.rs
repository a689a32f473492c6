use crate::{
    backup,
    collection::GameCollection,
    error::{Result, ShelfError},
    record::{GameDraft, GameRecord},
    store::{LoadStatus, ProfileStore},
};

#[derive(Debug)]
struct ActiveProfile {
    name: String,
    collection: GameCollection,
    status: LoadStatus,
    /// Set while the on-disk file is an unparsed corrupt copy.
    unsaved_corrupt: bool,
    /// Set while the last save failed and memory is ahead of the file.
    dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Added(usize),
    Updated(usize),
}

/// The running state of one interactive session: the active profile, its
/// in-memory collection and the record currently loaded for editing.
#[derive(Debug)]
pub struct Session {
    store: ProfileStore,
    active: Option<ActiveProfile>,
    selected: Option<usize>,
}

impl Session {
    /// Establishes an active profile, creating `Default` on first run. An error
    /// here means the application has nothing to show.
    pub fn open(store: ProfileStore, preferred: Option<&str>) -> Result<Self> {
        store.ensure_default()?;
        let profiles = store.list_profiles()?;
        let target = preferred
            .and_then(|name| profiles.iter().find(|profile| profile.as_str() == name))
            .or_else(|| profiles.first())
            .cloned()
            .ok_or(ShelfError::NoActiveProfile)?;

        let mut session = Self {
            store,
            active: None,
            selected: None,
        };
        session.switch_profile(&target)?;
        Ok(session)
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Profile names for display. An empty set is refilled with `Default`.
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        if self.store.ensure_default()? {
            log::info!("Profile set was empty; recreated default profile");
        }
        self.store.list_profiles()
    }

    pub fn create_profile(&mut self, name: &str) -> Result<String> {
        let name = self.store.create_profile(name)?;
        self.switch_profile(&name)?;
        Ok(name)
    }

    /// Deletes a profile. When it was active, the first remaining profile takes
    /// over, or the session is left without an active profile.
    pub fn delete_profile(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        self.store.delete_profile(name)?;
        if self.active_profile() != Some(name) {
            return Ok(());
        }

        let remaining = self.store.list_profiles()?;
        match remaining.first() {
            Some(first) => {
                let first = first.clone();
                self.switch_profile(&first)?;
            }
            None => {
                log::info!("No profile left after deleting {name}");
                self.active = None;
                self.selected = None;
            }
        }
        Ok(())
    }

    pub fn switch_profile(&mut self, name: &str) -> Result<LoadStatus> {
        let name = name.trim();
        if !self.store.exists(name)? {
            return Err(ShelfError::NotFound(name.to_string()));
        }
        let loaded = self.store.load_records(name)?;
        let unsaved_corrupt = matches!(loaded.status, LoadStatus::Corrupt(_));
        self.active = Some(ActiveProfile {
            name: name.to_string(),
            collection: GameCollection::new(loaded.records),
            status: loaded.status.clone(),
            unsaved_corrupt,
            dirty: false,
        });
        self.selected = None;
        log::info!("Switched to profile {name}");
        Ok(loaded.status)
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    pub fn load_status(&self) -> Option<&LoadStatus> {
        self.active.as_ref().map(|active| &active.status)
    }

    /// The corruption report for the active profile, if its file failed to
    /// parse when it was loaded.
    pub fn load_warning(&self) -> Option<ShelfError> {
        let active = self.active.as_ref()?;
        match &active.status {
            LoadStatus::Corrupt(reason) => Some(ShelfError::CorruptData {
                profile: active.name.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&GameCollection> {
        self.active.as_ref().map(|active| &active.collection)
    }

    pub fn sorted_view(&self) -> impl Iterator<Item = (usize, &GameRecord)> + '_ {
        self.active
            .iter()
            .flat_map(|active| active.collection.sorted_view())
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&GameRecord> {
        let index = self.selected?;
        self.collection()?.get(index)
    }

    /// Selects a record by its persisted index. Callers must take the index
    /// from a fresh `sorted_view()`.
    pub fn select(&mut self, index: usize) -> Result<&GameRecord> {
        let collection = self.collection().ok_or(ShelfError::NoActiveProfile)?;
        if collection.get(index).is_none() {
            return Err(ShelfError::OutOfRange {
                index,
                len: collection.len(),
            });
        }
        self.selected = Some(index);
        self.selected_record().ok_or(ShelfError::NoSelection)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn add(&mut self, draft: GameDraft) -> Result<usize> {
        let record = draft.into_record()?;
        let active = self.active.as_mut().ok_or(ShelfError::NoActiveProfile)?;
        if let Some(index) = unsaved_copy(active, &record, None) {
            self.selected = None;
            log::info!("Retrying save of {} in {}", record.title, active.name);
            persist(&self.store, active)?;
            return Ok(index);
        }
        let title = record.title.clone();
        let index = active.collection.add(record)?;
        self.selected = None;
        log::info!("Added {title} to {}", active.name);
        persist(&self.store, active)?;
        Ok(index)
    }

    pub fn update(&mut self, index: usize, draft: GameDraft) -> Result<()> {
        let record = draft.into_record()?;
        let active = self.active.as_mut().ok_or(ShelfError::NoActiveProfile)?;
        if unsaved_copy(active, &record, Some(index)).is_some() {
            self.selected = None;
            log::info!("Retrying save of {} in {}", record.title, active.name);
            return persist(&self.store, active);
        }
        let title = record.title.clone();
        active.collection.update(index, record)?;
        self.selected = None;
        log::info!("Updated {title} in {}", active.name);
        persist(&self.store, active)
    }

    pub fn delete(&mut self, index: usize) -> Result<GameRecord> {
        let active = self.active.as_mut().ok_or(ShelfError::NoActiveProfile)?;
        let removed = active.collection.delete(index)?;
        self.selected = None;
        log::info!("Deleted {} from {}", removed.title, active.name);
        persist(&self.store, active)?;
        Ok(removed)
    }

    /// Updates the selected record, or adds a new one when nothing is selected.
    pub fn submit(&mut self, draft: GameDraft) -> Result<SubmitOutcome> {
        match self.selected {
            Some(index) => {
                self.update(index, draft)?;
                Ok(SubmitOutcome::Updated(index))
            }
            None => self.add(draft).map(SubmitOutcome::Added),
        }
    }

    pub fn delete_selected(&mut self) -> Result<GameRecord> {
        let index = self.selected.ok_or(ShelfError::NoSelection)?;
        self.delete(index)
    }

    /// Writes the in-memory collection again, e.g. after a failed save.
    pub fn save(&mut self) -> Result<()> {
        let active = self.active.as_mut().ok_or(ShelfError::NoActiveProfile)?;
        persist(&self.store, active)
    }
}

/// While a save is pending, the index of a record equal to `record` that an
/// earlier, unsaved mutation already applied. `at` restricts the match to one
/// index.
fn unsaved_copy(active: &ActiveProfile, record: &GameRecord, at: Option<usize>) -> Option<usize> {
    if !active.dirty {
        return None;
    }
    let index = match at {
        Some(index) => index,
        None => active
            .collection
            .find_duplicate(&record.title, &record.platform, None)?,
    };
    (active.collection.get(index)? == record).then_some(index)
}

fn persist(store: &ProfileStore, active: &mut ActiveProfile) -> Result<()> {
    let result = save_active(store, active);
    active.dirty = result.is_err();
    result
}

fn save_active(store: &ProfileStore, active: &mut ActiveProfile) -> Result<()> {
    if active.unsaved_corrupt {
        backup::preserve_corrupt(store, &active.name)?;
        active.unsaved_corrupt = false;
    }
    store
        .save_records(&active.name, active.collection.records())
        .map_err(|err| {
            log::error!("Failed to save profile {}: {err}", active.name);
            err
        })
}
