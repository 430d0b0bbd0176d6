//! Lesson content: the ordered scenes the player walks through.
//!
//! Lessons are immutable once built. [`Lesson::new`] is the only way to get one,
//! and it validates interactions and replaces unusable scene durations so the player can
//! rely on `duration_seconds > 0` and answerable questions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::LessonError;

/// Scenes shorter than this are lifted to it unless configured otherwise.
pub const DEFAULT_MIN_SCENE_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevealItem {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The single blocking checkpoint a scene may carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Interaction {
    Choice {
        question: String,
        options: Vec<ChoiceOption>,
    },
    #[serde(rename_all = "camelCase")]
    ClickReveal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        items: Vec<RevealItem>,
    },
}

impl Interaction {
    pub fn kind(&self) -> &'static str {
        match self {
            Interaction::Choice { .. } => "choice",
            Interaction::ClickReveal { .. } => "click-reveal",
        }
    }

    fn validate(&self, scene: &str) -> Result<(), LessonError> {
        let ids: Vec<&str> = match self {
            Interaction::Choice { options, .. } => {
                if options.len() < 2 {
                    return Err(LessonError::TooFewOptions {
                        scene: scene.to_string(),
                        found: options.len(),
                    });
                }
                if !options.iter().any(|o| o.correct) {
                    return Err(LessonError::NoCorrectOption {
                        scene: scene.to_string(),
                    });
                }
                options.iter().map(|o| o.id.as_str()).collect()
            }
            Interaction::ClickReveal { items, .. } => {
                if items.is_empty() {
                    return Err(LessonError::EmptyReveal {
                        scene: scene.to_string(),
                    });
                }
                items.iter().map(|i| i.id.as_str()).collect()
            }
        };

        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                return Err(LessonError::DuplicateOptionId {
                    scene: scene.to_string(),
                    id: id.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One narrated segment of a lesson.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub duration_seconds: f64,
    #[serde(default)]
    pub narration_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Interaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_takeaway: Option<String>,
    /// Cosmetic payload for the renderer; never inspected by playback.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub visual_elements: serde_json::Value,
}

impl Scene {
    pub fn new(id: impl Into<String>, duration_seconds: f64, narration_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            duration_seconds,
            narration_text: narration_text.into(),
            interaction: None,
            key_takeaway: None,
            visual_elements: serde_json::Value::Null,
        }
    }

    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interaction = Some(interaction);
        self
    }

    pub fn with_key_takeaway(mut self, takeaway: impl Into<String>) -> Self {
        self.key_takeaway = Some(takeaway.into());
        self
    }

    pub fn duration_ms(&self) -> u64 {
        (self.duration_seconds * 1000.0).round() as u64
    }

    pub fn has_narration(&self) -> bool {
        !self.narration_text.trim().is_empty()
    }
}

#[derive(Deserialize)]
struct LessonFile {
    title: String,
    scenes: Vec<Scene>,
}

/// A validated, non-empty sequence of scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    title: String,
    scenes: Vec<Scene>,
}

impl Lesson {
    pub fn new(title: impl Into<String>, scenes: Vec<Scene>) -> Result<Self, LessonError> {
        Self::with_min_scene_seconds(title, scenes, DEFAULT_MIN_SCENE_SECONDS)
    }

    pub fn with_min_scene_seconds(
        title: impl Into<String>,
        mut scenes: Vec<Scene>,
        min_scene_seconds: f64,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if scenes.is_empty() {
            return Err(LessonError::Empty { title });
        }
        let fallback = if min_scene_seconds.is_finite() && min_scene_seconds > 0.0 {
            min_scene_seconds
        } else {
            warn!(
                min = min_scene_seconds,
                default = DEFAULT_MIN_SCENE_SECONDS,
                "unusable minimum scene duration, using default"
            );
            DEFAULT_MIN_SCENE_SECONDS
        };

        let mut ids = HashSet::new();
        for scene in scenes.iter_mut() {
            if !ids.insert(scene.id.clone()) {
                return Err(LessonError::DuplicateSceneId {
                    id: scene.id.clone(),
                });
            }
            // `!(d > 0.0)` also catches NaN; positive durations are kept as given
            if !(scene.duration_seconds > 0.0) || scene.duration_seconds.is_infinite() {
                warn!(
                    scene = %scene.id,
                    duration = scene.duration_seconds,
                    replacement = fallback,
                    "replacing unusable scene duration"
                );
                scene.duration_seconds = fallback;
            }
            if let Some(interaction) = &scene.interaction {
                interaction.validate(&scene.id)?;
            }
        }

        Ok(Self { title, scenes })
    }

    pub fn from_json(json: &str, min_scene_seconds: f64) -> Result<Self, LessonError> {
        let file: LessonFile = serde_json::from_str(json)?;
        Self::with_min_scene_seconds(file.title, file.scenes, min_scene_seconds)
    }

    pub fn from_path<P: AsRef<Path>>(path: P, min_scene_seconds: f64) -> Result<Self, LessonError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json, min_scene_seconds)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// A built lesson always has at least one scene.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.scenes.len() - 1
    }

    /// Sum of every scene's nominal duration, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_seconds).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn choice(correct: &[bool]) -> Interaction {
        Interaction::Choice {
            question: "Which?".into(),
            options: correct
                .iter()
                .enumerate()
                .map(|(i, &c)| ChoiceOption {
                    id: format!("o{i}"),
                    text: format!("option {i}"),
                    correct: c,
                    feedback: None,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_lesson_is_rejected() {
        assert_matches!(Lesson::new("t", vec![]), Err(LessonError::Empty { .. }));
    }

    #[test]
    fn non_positive_durations_are_clamped() {
        let lesson = Lesson::new(
            "t",
            vec![
                Scene::new("a", 0.0, ""),
                Scene::new("b", -4.0, ""),
                Scene::new("c", f64::NAN, ""),
                Scene::new("d", 2.5, ""),
            ],
        )
        .unwrap();

        let durations: Vec<f64> = lesson.scenes().iter().map(|s| s.duration_seconds).collect();
        assert_eq!(durations, vec![1.0, 1.0, 1.0, 2.5]);
    }

    #[test]
    fn short_positive_durations_are_kept() {
        let lesson = Lesson::new(
            "t",
            vec![Scene::new("a", 0.5, ""), Scene::new("b", 2.0, "")],
        )
        .unwrap();

        assert_eq!(lesson.scenes()[0].duration_seconds, 0.5);
        assert_eq!(lesson.total_duration(), 2.5);
    }

    #[test]
    fn unusable_minimum_falls_back_to_default() {
        for min in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let lesson = Lesson::with_min_scene_seconds(
                "t",
                vec![
                    Scene::new("a", 0.0, ""),
                    Scene::new("b", -3.0, ""),
                    Scene::new("c", 5.0, ""),
                ],
                min,
            )
            .unwrap();

            let durations: Vec<f64> = lesson.scenes().iter().map(|s| s.duration_seconds).collect();
            assert_eq!(
                durations,
                vec![DEFAULT_MIN_SCENE_SECONDS, DEFAULT_MIN_SCENE_SECONDS, 5.0],
                "min = {min}"
            );
        }
    }

    #[test]
    fn configured_minimum_replaces_bad_durations() {
        let lesson = Lesson::with_min_scene_seconds(
            "t",
            vec![Scene::new("a", 0.0, ""), Scene::new("b", 0.25, "")],
            2.0,
        )
        .unwrap();

        let durations: Vec<f64> = lesson.scenes().iter().map(|s| s.duration_seconds).collect();
        assert_eq!(durations, vec![2.0, 0.25]);
    }

    #[test]
    fn total_duration_sums_scenes() {
        let lesson = Lesson::new(
            "t",
            vec![Scene::new("a", 10.0, ""), Scene::new("b", 4.5, "")],
        )
        .unwrap();
        assert_eq!(lesson.total_duration(), 14.5);
        assert_eq!(lesson.last_index(), 1);
    }

    #[test]
    fn choice_without_correct_option_is_rejected() {
        let scene = Scene::new("q", 5.0, "").with_interaction(choice(&[false, false]));
        assert_matches!(
            Lesson::new("t", vec![scene]),
            Err(LessonError::NoCorrectOption { scene }) if scene == "q"
        );
    }

    #[test]
    fn choice_with_single_option_is_rejected() {
        let scene = Scene::new("q", 5.0, "").with_interaction(choice(&[true]));
        assert_matches!(
            Lesson::new("t", vec![scene]),
            Err(LessonError::TooFewOptions { found: 1, .. })
        );
    }

    #[test]
    fn several_correct_options_are_allowed() {
        let scene = Scene::new("q", 5.0, "").with_interaction(choice(&[true, true, false]));
        assert!(Lesson::new("t", vec![scene]).is_ok());
    }

    #[test]
    fn empty_reveal_is_rejected() {
        let scene = Scene::new("r", 5.0, "").with_interaction(Interaction::ClickReveal {
            prompt: None,
            items: vec![],
        });
        assert_matches!(
            Lesson::new("t", vec![scene]),
            Err(LessonError::EmptyReveal { .. })
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        assert_matches!(
            Lesson::new("t", vec![Scene::new("a", 1.0, ""), Scene::new("a", 1.0, "")]),
            Err(LessonError::DuplicateSceneId { id }) if id == "a"
        );

        let items = vec![
            RevealItem {
                id: "x".into(),
                label: "X".into(),
                detail: None,
            },
            RevealItem {
                id: "x".into(),
                label: "X again".into(),
                detail: None,
            },
        ];
        let scene = Scene::new("r", 1.0, "").with_interaction(Interaction::ClickReveal {
            prompt: None,
            items,
        });
        assert_matches!(
            Lesson::new("t", vec![scene]),
            Err(LessonError::DuplicateOptionId { .. })
        );
    }

    #[test]
    fn parses_lesson_json() {
        let json = r#"
        {
            "title": "Fractions",
            "scenes": [
                {
                    "id": "intro",
                    "durationSeconds": 8,
                    "narrationText": "A fraction is a part of a whole.",
                    "keyTakeaway": "Fractions describe parts.",
                    "visualElements": [{"kind": "pie", "slices": 4}]
                },
                {
                    "id": "check",
                    "durationSeconds": 6,
                    "interaction": {
                        "type": "choice",
                        "question": "What is 1/2 of 4?",
                        "options": [
                            {"id": "a", "text": "2", "correct": true, "feedback": "Yes!"},
                            {"id": "b", "text": "3"}
                        ]
                    }
                },
                {
                    "id": "parts",
                    "durationSeconds": 6,
                    "interaction": {
                        "type": "clickReveal",
                        "items": [{"id": "n", "label": "Numerator"}, {"id": "d", "label": "Denominator"}]
                    }
                }
            ]
        }
        "#;

        let lesson = Lesson::from_json(json, DEFAULT_MIN_SCENE_SECONDS).unwrap();
        assert_eq!(lesson.title(), "Fractions");
        assert_eq!(lesson.len(), 3);
        assert!(lesson.scenes()[0].has_narration());
        assert!(!lesson.scenes()[1].has_narration());
        assert_matches!(
            &lesson.scenes()[1].interaction,
            Some(Interaction::Choice { options, .. }) if options.len() == 2 && !options[1].correct
        );
        assert_matches!(
            &lesson.scenes()[2].interaction,
            Some(Interaction::ClickReveal { items, .. }) if items.len() == 2
        );
        assert_eq!(lesson.scenes()[0].duration_ms(), 8000);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert_matches!(
            Lesson::from_json("{\"title\": 3}", DEFAULT_MIN_SCENE_SECONDS),
            Err(LessonError::Json(_))
        );
    }
}
