use crate::error::{Result, ShelfError};
use serde::{Deserialize, Deserializer, Serialize};

pub const UNSPECIFIED_GENRE: &str = "Unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GameStatus {
    Owned,
    InProgress,
    Finished,
    Wishlisted,
}

impl Default for GameStatus {
    fn default() -> Self {
        GameStatus::Owned
    }
}

impl GameStatus {
    pub const ALL: [GameStatus; 4] = [
        GameStatus::Owned,
        GameStatus::InProgress,
        GameStatus::Finished,
        GameStatus::Wishlisted,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GameStatus::Owned => "Owned",
            GameStatus::InProgress => "In progress",
            GameStatus::Finished => "Finished",
            GameStatus::Wishlisted => "Wishlisted",
        }
    }

    /// Lenient parse for typed input: ignores case, spaces, `-` and `_`.
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "owned" | "possédé" => Some(GameStatus::Owned),
            "inprogress" | "playing" | "encours" => Some(GameStatus::InProgress),
            "finished" | "done" | "fini" => Some(GameStatus::Finished),
            "wishlisted" | "wishlist" | "souhaité" => Some(GameStatus::Wishlisted),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Accepts variant names, typed labels and the legacy French labels. Unknown
/// labels read as `Owned`.
impl<'de> Deserialize<'de> for GameStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(GameStatus::parse(&raw).unwrap_or_else(|| {
            log::warn!("Unknown game status {raw:?}, reading as Owned");
            GameStatus::Owned
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub title: String,
    pub platform: String,
    #[serde(default = "default_genre")]
    pub genre: String,
    #[serde(default)]
    pub status: GameStatus,
}

impl GameRecord {
    /// True when `title`/`platform` name the same game, ignoring case.
    pub fn same_key(&self, title: &str, platform: &str) -> bool {
        fold_key(&self.title) == fold_key(title) && fold_key(&self.platform) == fold_key(platform)
    }

    pub fn sort_key(&self) -> String {
        fold_key(&self.title)
    }
}

/// Raw form input, before trimming and defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameDraft {
    pub title: String,
    pub platform: String,
    pub genre: String,
    pub status: GameStatus,
}

impl GameDraft {
    pub fn new(title: &str, platform: &str, genre: &str, status: GameStatus) -> Self {
        Self {
            title: title.to_string(),
            platform: platform.to_string(),
            genre: genre.to_string(),
            status,
        }
    }

    pub fn from_record(record: &GameRecord) -> Self {
        Self {
            title: record.title.clone(),
            platform: record.platform.clone(),
            genre: record.genre.clone(),
            status: record.status,
        }
    }

    pub fn into_record(self) -> Result<GameRecord> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ShelfError::MissingField("Title"));
        }
        let platform = self.platform.trim();
        if platform.is_empty() {
            return Err(ShelfError::MissingField("Platform"));
        }
        let genre = self.genre.trim();
        Ok(GameRecord {
            title: title.to_string(),
            platform: platform.to_string(),
            genre: if genre.is_empty() {
                UNSPECIFIED_GENRE.to_string()
            } else {
                genre.to_string()
            },
            status: self.status,
        })
    }
}

fn default_genre() -> String {
    UNSPECIFIED_GENRE.to_string()
}

fn fold_key(value: &str) -> String {
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_trims_fields_and_defaults_genre() {
        let record = GameDraft::new("  Tetris ", " GB", "   ", GameStatus::Owned)
            .into_record()
            .unwrap();
        assert_eq!(record.title, "Tetris");
        assert_eq!(record.platform, "GB");
        assert_eq!(record.genre, UNSPECIFIED_GENRE);
    }

    #[test]
    fn draft_requires_title_and_platform() {
        let err = GameDraft::new(" ", "GB", "", GameStatus::Owned)
            .into_record()
            .unwrap_err();
        assert!(matches!(err, ShelfError::MissingField("Title")));

        let err = GameDraft::new("Tetris", "", "", GameStatus::Owned)
            .into_record()
            .unwrap_err();
        assert!(matches!(err, ShelfError::MissingField("Platform")));
    }

    #[test]
    fn same_key_ignores_case() {
        let record = GameDraft::new("Pokémon Red", "GB", "RPG", GameStatus::Finished)
            .into_record()
            .unwrap();
        assert!(record.same_key("POKÉMON RED", "gb"));
        assert!(!record.same_key("Pokémon Red", "GBC"));
    }

    #[test]
    fn status_reads_legacy_labels() {
        let raw = r#"[
            {"title": "Zelda", "platform": "NES", "genre": "Aventure", "status": "Souhaité"},
            {"title": "Mario", "platform": "NES", "genre": "Plateforme", "status": "En cours"}
        ]"#;
        let records: Vec<GameRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(records[0].status, GameStatus::Wishlisted);
        assert_eq!(records[1].status, GameStatus::InProgress);

        let written = serde_json::to_string(&records[1]).unwrap();
        assert!(written.contains(r#""status":"InProgress""#));
    }

    #[test]
    fn unknown_status_reads_as_owned_without_dropping_records() {
        let raw = r#"[
            {"title": "Zelda", "platform": "NES", "genre": "Aventure", "status": "Terminé"},
            {"title": "Okami", "platform": "PS2", "genre": "Action", "status": "Finished"}
        ]"#;
        let records: Vec<GameRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, GameStatus::Owned);
        assert_eq!(records[0].title, "Zelda");
        assert_eq!(records[1].status, GameStatus::Finished);
    }

    #[test]
    fn missing_genre_reads_as_unspecified() {
        let raw = r#"{"title": "Doom", "platform": "PC", "status": "Owned"}"#;
        let record: GameRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.genre, UNSPECIFIED_GENRE);
    }

    #[test]
    fn status_parse_and_cycle() {
        assert_eq!(GameStatus::parse("in-progress"), Some(GameStatus::InProgress));
        assert_eq!(GameStatus::parse("WISHLIST"), Some(GameStatus::Wishlisted));
        assert_eq!(GameStatus::parse("lost"), None);
        assert_eq!(GameStatus::Wishlisted.next(), GameStatus::Owned);
        assert_eq!(GameStatus::Owned.prev(), GameStatus::Wishlisted);
    }
}
