//! Error types for lesson loading, interaction handling and the completion log.
//!
//! Playback itself never fails: bad durations are clamped, empty narration is
//! skipped and a missing voice degrades to timer pacing. Only content loading,
//! explicit user input against the interaction gate, and the history database
//! surface errors to the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LessonError {
    /// A lesson must contain at least one scene.
    #[error("lesson '{title}' has no scenes")]
    Empty { title: String },

    #[error("scene id '{id}' is used more than once")]
    DuplicateSceneId { id: String },

    /// A choice question nobody can answer correctly would hold the scene forever.
    #[error("scene '{scene}': choice question has no correct option")]
    NoCorrectOption { scene: String },

    #[error("scene '{scene}': choice question needs at least two options, found {found}")]
    TooFewOptions { scene: String, found: usize },

    #[error("scene '{scene}': click-reveal interaction has no items")]
    EmptyReveal { scene: String },

    #[error("scene '{scene}': option id '{id}' is used more than once")]
    DuplicateOptionId { scene: String, id: String },

    #[error("no bundled lesson named '{name}'")]
    UnknownBundledLesson { name: String },

    #[error("invalid lesson json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("option '{0}' does not belong to this interaction")]
    UnknownOption(String),

    #[error("this scene has no {expected} interaction")]
    WrongVariant { expected: &'static str },

    #[error("interaction is already resolved")]
    AlreadyResolved,
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
