use crate::{
    config::AppConfig,
    error::ShelfError,
    logging::LogBuffer,
    record::{GameDraft, GameRecord},
    session::{Session, SubmitOutcome},
    store::{LoadStatus, ProfileStore},
};
use anyhow::{Context, Result};
use std::time::{Duration, Instant};

const TOAST_SECS: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    CreateProfile,
    FilterGames,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        purpose: InputPurpose,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Games,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Platform,
    Genre,
    Status,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Title,
        FormField::Platform,
        FormField::Genre,
        FormField::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Platform => "Platform",
            FormField::Genre => "Genre",
            FormField::Status => "Status",
        }
    }

    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Platform,
            FormField::Platform => FormField::Genre,
            FormField::Genre => FormField::Status,
            FormField::Status => FormField::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Title => FormField::Status,
            FormField::Platform => FormField::Title,
            FormField::Genre => FormField::Platform,
            FormField::Status => FormField::Genre,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub struct DialogToggle {
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone)]
pub enum DialogKind {
    DeleteProfile { name: String },
    DeleteGame { title: String },
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub yes_label: String,
    pub no_label: String,
    pub choice: DialogChoice,
    pub kind: DialogKind,
    pub toggle: Option<DialogToggle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

pub struct App {
    pub config: AppConfig,
    pub session: Session,
    pub profiles: Vec<String>,
    /// Persisted indices in display order, taken from the last sorted view.
    pub rows: Vec<usize>,
    pub cursor: usize,
    pub filter: Option<String>,
    pub focus: Focus,
    pub form: GameDraft,
    pub form_field: FormField,
    pub input_mode: InputMode,
    pub dialog: Option<Dialog>,
    pub status: String,
    pub toast: Option<Toast>,
    pub logs: LogBuffer,
    pub should_quit: bool,
}

impl App {
    pub fn initialize(config: AppConfig, logs: LogBuffer) -> Result<Self> {
        let store = ProfileStore::new(config.profiles_dir());
        let session = Session::open(store, config.last_profile.as_deref())
            .context("unable to load or create a profile")?;

        let mut app = Self {
            config,
            session,
            profiles: Vec::new(),
            rows: Vec::new(),
            cursor: 0,
            filter: None,
            focus: Focus::Games,
            form: GameDraft::default(),
            form_field: FormField::Title,
            input_mode: InputMode::Normal,
            dialog: None,
            status: String::new(),
            toast: None,
            logs,
            should_quit: false,
        };
        app.after_profile_change();
        Ok(app)
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= Instant::now() {
                self.toast = None;
            }
        }
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + Duration::from_secs(TOAST_SECS),
        });
    }

    fn report(&mut self, action: &str, err: ShelfError) {
        let level = match err {
            ShelfError::Io(_) | ShelfError::Json(_) | ShelfError::CorruptData { .. } => {
                log::error!("{action} failed: {err}");
                ToastLevel::Error
            }
            _ => {
                log::warn!("{action} rejected: {err}");
                ToastLevel::Warn
            }
        };
        self.status = format!("{action} failed: {err}");
        self.set_toast(&err.to_string(), level);
    }

    pub fn refresh(&mut self) {
        match self.session.list_profiles() {
            Ok(profiles) => self.profiles = profiles,
            Err(err) => self.report("List profiles", err),
        }
        let needle = self.filter.as_ref().map(|value| value.to_lowercase());
        self.rows = self
            .session
            .sorted_view()
            .filter(|(_, record)| match &needle {
                Some(needle) => record.title.to_lowercase().contains(needle),
                None => true,
            })
            .map(|(index, _)| index)
            .collect();
        self.clamp_cursor();
    }

    pub fn clamp_cursor(&mut self) {
        if self.rows.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len() - 1;
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.rows.len() as isize - 1) as usize;
    }

    pub fn record_at_row(&self, row: usize) -> Option<(usize, &GameRecord)> {
        let index = *self.rows.get(row)?;
        let record = self.session.collection()?.get(index)?;
        Some((index, record))
    }

    pub fn active_profile_label(&self) -> String {
        self.session
            .active_profile()
            .map(|name| name.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Games => Focus::Form,
            Focus::Form => Focus::Games,
        };
    }

    fn reset_form(&mut self) {
        self.form = GameDraft::default();
        self.form_field = FormField::Title;
    }

    fn after_profile_change(&mut self) {
        self.reset_form();
        self.cursor = 0;
        self.filter = None;
        self.refresh();
        let active = self.session.active_profile().map(|name| name.to_string());
        if let Err(err) = self.config.remember_profile(active.as_deref()) {
            log::warn!("Failed to remember active profile: {err:#}");
        }
        match self.session.load_status().cloned() {
            Some(LoadStatus::Corrupt(_)) => {
                if let Some(warning) = self.session.load_warning() {
                    self.status = format!("{warning}. The file was left untouched.");
                    self.set_toast("Profile data is corrupt", ToastLevel::Error);
                }
            }
            Some(LoadStatus::Created) => {
                self.status = format!("Profile file recreated: {}", self.active_profile_label());
            }
            Some(LoadStatus::Loaded) => {
                self.status = format!("Profile loaded: {}", self.active_profile_label());
            }
            None => {
                self.status = "No active profile. Press c to create one.".to_string();
            }
        }
    }

    pub fn cycle_profile(&mut self, delta: isize) {
        if self.profiles.is_empty() {
            return;
        }
        let len = self.profiles.len() as isize;
        let current = self
            .session
            .active_profile()
            .and_then(|active| self.profiles.iter().position(|name| name == active))
            .map(|index| index as isize)
            .unwrap_or(-1);
        let next = (current + delta).rem_euclid(len) as usize;
        let name = self.profiles[next].clone();
        self.switch_profile(&name);
    }

    pub fn switch_profile(&mut self, name: &str) {
        match self.session.switch_profile(name) {
            Ok(_) => self.after_profile_change(),
            Err(err) => self.report("Switch profile", err),
        }
    }

    pub fn enter_create_profile(&mut self) {
        self.input_mode = InputMode::Editing {
            prompt: "New profile name".to_string(),
            buffer: String::new(),
            purpose: InputPurpose::CreateProfile,
        };
    }

    pub fn enter_filter(&mut self) {
        self.input_mode = InputMode::Editing {
            prompt: "Filter titles".to_string(),
            buffer: self.filter.clone().unwrap_or_default(),
            purpose: InputPurpose::FilterGames,
        };
    }

    pub fn handle_submit(&mut self, purpose: InputPurpose, value: String) {
        match purpose {
            InputPurpose::CreateProfile => self.create_profile(&value),
            InputPurpose::FilterGames => {
                let value = value.trim();
                self.filter = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
                self.cursor = 0;
                self.refresh();
            }
        }
    }

    pub fn create_profile(&mut self, name: &str) {
        match self.session.create_profile(name) {
            Ok(name) => {
                self.after_profile_change();
                self.set_toast(&format!("Profile created: {name}"), ToastLevel::Info);
            }
            Err(err) => self.report("Create profile", err),
        }
    }

    pub fn prompt_delete_profile(&mut self) {
        let Some(name) = self.session.active_profile().map(|name| name.to_string()) else {
            self.status = "No profile to delete".to_string();
            return;
        };
        if !self.config.confirm_profile_delete {
            self.delete_profile(&name);
            return;
        }
        self.dialog = Some(Dialog {
            title: "Delete Profile".to_string(),
            message: format!("Delete profile '{name}' and all of its games?"),
            yes_label: "Delete".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::DeleteProfile { name },
            toggle: Some(DialogToggle {
                label: "Don't ask again for this action?".to_string(),
                checked: false,
            }),
        });
    }

    pub fn delete_profile(&mut self, name: &str) {
        match self.session.delete_profile(name) {
            Ok(()) => {
                self.after_profile_change();
                self.set_toast(&format!("Profile deleted: {name}"), ToastLevel::Info);
            }
            Err(err) => self.report("Delete profile", err),
        }
    }

    /// Loads the highlighted row into the edit form.
    pub fn edit_current(&mut self) {
        let Some(index) = self.rows.get(self.cursor).copied() else {
            return;
        };
        match self.session.select(index) {
            Ok(record) => {
                self.form = GameDraft::from_record(record);
                self.form_field = FormField::Title;
                self.focus = Focus::Form;
                self.status = format!("Editing {}", self.form.title);
            }
            Err(err) => self.report("Select game", err),
        }
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
        self.reset_form();
        self.status = "Selection cleared".to_string();
    }

    /// Drops the selection so the form adds a new game.
    pub fn new_entry(&mut self) {
        self.session.clear_selection();
        self.reset_form();
        self.focus = Focus::Form;
        self.status = "New game".to_string();
    }

    pub fn submit_form(&mut self) {
        let draft = self.form.clone();
        match self.session.submit(draft) {
            Ok(outcome) => {
                let (verb, index) = match outcome {
                    SubmitOutcome::Added(index) => ("added", index),
                    SubmitOutcome::Updated(index) => ("updated", index),
                };
                let title = self
                    .session
                    .collection()
                    .and_then(|collection| collection.get(index))
                    .map(|record| record.title.clone())
                    .unwrap_or_default();
                self.reset_form();
                self.refresh();
                if let Some(row) = self.rows.iter().position(|row| *row == index) {
                    self.cursor = row;
                }
                self.status = format!("'{title}' {verb}");
                self.set_toast(&format!("'{title}' {verb}"), ToastLevel::Info);
            }
            Err(err) => {
                if matches!(err, ShelfError::Io(_)) {
                    // The change is kept in memory; show it while the save is retried.
                    self.refresh();
                }
                self.report("Save game", err);
            }
        }
    }

    pub fn prompt_delete_game(&mut self) {
        let Some(index) = self.rows.get(self.cursor).copied() else {
            self.status = "No game selected".to_string();
            return;
        };
        let title = match self.session.select(index) {
            Ok(record) => record.title.clone(),
            Err(err) => {
                self.report("Select game", err);
                return;
            }
        };
        if let Some(record) = self.session.selected_record() {
            self.form = GameDraft::from_record(record);
        }
        if !self.config.confirm_game_delete {
            self.delete_selected_game();
            return;
        }
        self.dialog = Some(Dialog {
            title: "Delete Game".to_string(),
            message: format!("Delete '{title}'?"),
            yes_label: "Delete".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::DeleteGame { title },
            toggle: None,
        });
    }

    fn delete_selected_game(&mut self) {
        match self.session.delete_selected() {
            Ok(removed) => {
                self.reset_form();
                self.refresh();
                self.status = format!("'{}' deleted", removed.title);
                self.set_toast("Game deleted", ToastLevel::Info);
            }
            Err(err) => {
                if matches!(err, ShelfError::Io(_)) {
                    self.refresh();
                }
                self.report("Delete game", err);
            }
        }
    }

    pub fn retry_save(&mut self) {
        match self.session.save() {
            Ok(()) => {
                self.status = format!("Saved {}", self.active_profile_label());
                self.set_toast("Saved", ToastLevel::Info);
            }
            Err(err) => self.report("Save", err),
        }
    }

    pub fn dialog_choice_left(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = DialogChoice::Yes;
        }
    }

    pub fn dialog_choice_right(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = DialogChoice::No;
        }
    }

    pub fn dialog_set_choice(&mut self, choice: DialogChoice) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = choice;
        }
    }

    pub fn dialog_toggle(&mut self) {
        if let Some(toggle) = self.dialog.as_mut().and_then(|dialog| dialog.toggle.as_mut()) {
            toggle.checked = !toggle.checked;
        }
    }

    /// Applies the dialog. A "No" answer is a silent no-op.
    pub fn dialog_confirm(&mut self) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        if !matches!(dialog.choice, DialogChoice::Yes) {
            return;
        }

        match dialog.kind {
            DialogKind::DeleteProfile { name } => {
                if dialog.toggle.map(|toggle| toggle.checked).unwrap_or(false) {
                    self.config.confirm_profile_delete = false;
                    if let Err(err) = self.config.save() {
                        log::warn!("Failed to save config: {err:#}");
                    }
                }
                self.delete_profile(&name);
            }
            DialogKind::DeleteGame { title } => {
                log::debug!("Confirmed delete of {title}");
                self.delete_selected_game();
            }
        }
    }

    pub fn form_value_mut(&mut self) -> Option<&mut String> {
        match self.form_field {
            FormField::Title => Some(&mut self.form.title),
            FormField::Platform => Some(&mut self.form.platform),
            FormField::Genre => Some(&mut self.form.genre),
            FormField::Status => None,
        }
    }

    pub fn form_next_field(&mut self) {
        self.form_field = self.form_field.next();
    }

    pub fn form_prev_field(&mut self) {
        self.form_field = self.form_field.prev();
    }

    pub fn cycle_status(&mut self, forward: bool) {
        self.form.status = if forward {
            self.form.status.next()
        } else {
            self.form.status.prev()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GameStatus;
    use tempfile::TempDir;

    fn app() -> (TempDir, App) {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load_or_create(Some(tmp.path())).unwrap();
        let app = App::initialize(config, LogBuffer::default()).unwrap();
        (tmp, app)
    }

    fn fill_form(app: &mut App, title: &str, platform: &str) {
        app.form = GameDraft::new(title, platform, "", GameStatus::Owned);
    }

    #[test]
    fn rows_follow_sorted_view() {
        let (_tmp, mut app) = app();
        fill_form(&mut app, "Zelda", "NES");
        app.submit_form();
        fill_form(&mut app, "Metroid", "NES");
        app.submit_form();
        assert_eq!(app.rows, vec![1, 0]);
        assert_eq!(app.record_at_row(0).unwrap().1.title, "Metroid");
    }

    #[test]
    fn edit_then_submit_updates_in_place() {
        let (_tmp, mut app) = app();
        fill_form(&mut app, "Zelda", "NES");
        app.submit_form();
        app.cursor = 0;
        app.edit_current();
        assert_eq!(app.session.selected(), Some(0));
        assert_eq!(app.form.title, "Zelda");
        app.cycle_status(true);
        app.submit_form();
        let record = app.session.collection().unwrap().get(0).unwrap();
        assert_eq!(record.status, GameStatus::InProgress);
        assert_eq!(app.session.selected(), None);
    }

    #[test]
    fn cancelled_delete_is_a_no_op() {
        let (_tmp, mut app) = app();
        fill_form(&mut app, "Zelda", "NES");
        app.submit_form();
        app.prompt_delete_game();
        assert!(app.dialog.is_some());
        app.dialog_set_choice(DialogChoice::No);
        app.dialog_confirm();
        assert_eq!(app.session.collection().unwrap().len(), 1);

        app.prompt_delete_game();
        app.dialog_set_choice(DialogChoice::Yes);
        app.dialog_confirm();
        assert_eq!(app.session.collection().unwrap().len(), 0);
        assert!(app.rows.is_empty());
    }

    #[test]
    fn profile_lifecycle_remembers_active() {
        let (tmp, mut app) = app();
        app.create_profile("Arcade");
        assert_eq!(app.session.active_profile(), Some("Arcade"));
        assert_eq!(app.profiles, vec!["Arcade", "Default"]);

        let reloaded = AppConfig::load_or_create(Some(tmp.path())).unwrap();
        assert_eq!(reloaded.last_profile.as_deref(), Some("Arcade"));

        app.prompt_delete_profile();
        app.dialog_set_choice(DialogChoice::Yes);
        app.dialog_toggle();
        app.dialog_confirm();
        assert_eq!(app.session.active_profile(), Some("Default"));
        assert!(!app.config.confirm_profile_delete);

        app.prompt_delete_profile();
        assert!(app.dialog.is_none());
        assert_eq!(app.session.active_profile(), Some("Default"));
        assert!(app.status.contains("cannot be deleted"));
    }

    #[test]
    fn filter_narrows_rows() {
        let (_tmp, mut app) = app();
        fill_form(&mut app, "Zelda", "NES");
        app.submit_form();
        fill_form(&mut app, "Metroid", "NES");
        app.submit_form();
        app.handle_submit(InputPurpose::FilterGames, "zel".to_string());
        assert_eq!(app.rows, vec![0]);
        app.handle_submit(InputPurpose::FilterGames, String::new());
        assert_eq!(app.rows.len(), 2);
    }
}
