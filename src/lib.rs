// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod history;
pub mod lesson;
pub mod narration;
pub mod player;
pub mod runtime;
pub mod subtitle;

pub use error::{GateError, HistoryError, LessonError};
pub use lesson::{Interaction, Lesson, Scene};
pub use player::{Notice, PlaybackState, Player};
