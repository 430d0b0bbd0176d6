//! Lessons compiled into the binary.

use include_dir::{include_dir, Dir};

use crate::error::LessonError;
use crate::lesson::Lesson;

static LESSON_DIR: Dir = include_dir!("lessons");

/// Names of the bundled lessons, sorted, without the `.json` extension.
pub fn list() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = LESSON_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|f| f.path().file_stem().and_then(|s| s.to_str()))
        .collect();
    names.sort_unstable();
    names
}

pub fn load(name: &str, min_scene_seconds: f64) -> Result<Lesson, LessonError> {
    let unknown = || LessonError::UnknownBundledLesson {
        name: name.to_string(),
    };
    let file = LESSON_DIR.get_file(format!("{name}.json")).ok_or_else(unknown)?;
    let json = file.contents_utf8().ok_or_else(unknown)?;
    Lesson::from_json(json, min_scene_seconds)
}
