use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Invalid profile name: {0:?}")]
    InvalidName(String),

    #[error("Profile already exists: {0}")]
    DuplicateName(String),

    #[error("Game already in collection: {title} ({platform})")]
    DuplicateRecord { title: String, platform: String },

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("No game at index {index} (collection has {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Profile '{0}' cannot be deleted")]
    Protected(String),

    #[error("Profile data is corrupt: {profile} ({reason})")]
    CorruptData { profile: String, reason: String },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("No active profile")]
    NoActiveProfile,

    #[error("No game selected")]
    NoSelection,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShelfError>;
