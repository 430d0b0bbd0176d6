//! The blocking checkpoint inside a scene.
//!
//! A gate resolves at most once. A correct choice or a fully revealed set only
//! schedules resolution; the player learns about it on the poll after the
//! configured delay, so the learner has time to read the feedback.

use std::collections::HashSet;

use tracing::debug;

use crate::clock::Deadline;
use crate::config::PlaybackTimings;
use crate::error::GateError;
use crate::lesson::{ChoiceOption, Interaction, RevealItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateDelays {
    pub correct_choice_ms: u64,
    pub reveal_complete_ms: u64,
}

impl From<&PlaybackTimings> for GateDelays {
    fn from(t: &PlaybackTimings) -> Self {
        Self {
            correct_choice_ms: t.correct_choice_delay_ms,
            reveal_complete_ms: t.reveal_complete_delay_ms,
        }
    }
}

impl Default for GateDelays {
    fn default() -> Self {
        Self::from(&PlaybackTimings::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    None,
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceOutcome {
    Correct,
    Incorrect,
    /// A previous answer is still on screen; retry first.
    Ignored,
}

/// Emitted once, when a gate opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Choice answers restart paused playback; reveals do not.
    pub resumes_playback: bool,
}

#[derive(Clone, Debug)]
enum GateState {
    Open,
    Choice {
        options: Vec<ChoiceOption>,
        selected: Option<String>,
        feedback: Feedback,
    },
    Reveal {
        items: Vec<RevealItem>,
        revealed: HashSet<String>,
    },
}

#[derive(Clone, Debug)]
pub struct InteractionGate {
    state: GateState,
    delays: GateDelays,
    resolve_at: Option<Deadline>,
    resolved: bool,
}

impl InteractionGate {
    pub fn new(interaction: Option<&Interaction>, delays: GateDelays) -> Self {
        let state = match interaction {
            None => GateState::Open,
            Some(Interaction::Choice { options, .. }) => GateState::Choice {
                options: options.clone(),
                selected: None,
                feedback: Feedback::None,
            },
            Some(Interaction::ClickReveal { items, .. }) => GateState::Reveal {
                items: items.clone(),
                revealed: HashSet::new(),
            },
        };
        Self {
            state,
            delays,
            resolve_at: None,
            resolved: false,
        }
    }

    pub fn has_interaction(&self) -> bool {
        !matches!(self.state, GateState::Open)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// True while the scene must not advance.
    pub fn is_blocking(&self) -> bool {
        self.has_interaction() && !self.resolved
    }

    pub fn is_resolution_pending(&self) -> bool {
        self.resolve_at.is_some() && !self.resolved
    }

    pub fn feedback(&self) -> Feedback {
        match &self.state {
            GateState::Choice { feedback, .. } => *feedback,
            _ => Feedback::None,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        match &self.state {
            GateState::Choice { selected, .. } => selected.as_deref(),
            _ => None,
        }
    }

    /// Author-supplied feedback for the current selection, if any.
    pub fn selected_feedback_text(&self) -> Option<&str> {
        match &self.state {
            GateState::Choice {
                options,
                selected: Some(id),
                ..
            } => options
                .iter()
                .find(|o| &o.id == id)
                .and_then(|o| o.feedback.as_deref()),
            _ => None,
        }
    }

    pub fn is_revealed(&self, item_id: &str) -> bool {
        match &self.state {
            GateState::Reveal { revealed, .. } => revealed.contains(item_id),
            _ => false,
        }
    }

    pub fn revealed_count(&self) -> usize {
        match &self.state {
            GateState::Reveal { revealed, .. } => revealed.len(),
            _ => 0,
        }
    }

    /// Id of the n-th option or item, for hosts that address them by position.
    pub fn id_at(&self, index: usize) -> Option<&str> {
        match &self.state {
            GateState::Open => None,
            GateState::Choice { options, .. } => options.get(index).map(|o| o.id.as_str()),
            GateState::Reveal { items, .. } => items.get(index).map(|i| i.id.as_str()),
        }
    }

    pub fn select(&mut self, option_id: &str, now_ms: u64) -> Result<ChoiceOutcome, GateError> {
        let GateState::Choice {
            options,
            selected,
            feedback,
        } = &mut self.state
        else {
            return Err(GateError::WrongVariant { expected: "choice" });
        };
        if self.resolved {
            return Err(GateError::AlreadyResolved);
        }
        let option = options
            .iter()
            .find(|o| o.id == option_id)
            .ok_or_else(|| GateError::UnknownOption(option_id.to_string()))?;
        if selected.is_some() {
            return Ok(ChoiceOutcome::Ignored);
        }

        *selected = Some(option.id.clone());
        if option.correct {
            *feedback = Feedback::Correct;
            self.resolve_at = Some(Deadline::after(now_ms, self.delays.correct_choice_ms));
            debug!(option = option_id, "correct answer, resolving after delay");
            Ok(ChoiceOutcome::Correct)
        } else {
            *feedback = Feedback::Incorrect;
            debug!(option = option_id, "incorrect answer");
            Ok(ChoiceOutcome::Incorrect)
        }
    }

    /// Clears an incorrect answer so another option can be chosen.
    pub fn retry(&mut self) -> bool {
        match &mut self.state {
            GateState::Choice {
                selected, feedback, ..
            } if *feedback == Feedback::Incorrect => {
                *selected = None;
                *feedback = Feedback::None;
                true
            }
            _ => false,
        }
    }

    /// Reveals one item. Returns whether it was newly revealed.
    pub fn reveal(&mut self, item_id: &str, now_ms: u64) -> Result<bool, GateError> {
        let GateState::Reveal { items, revealed } = &mut self.state else {
            return Err(GateError::WrongVariant {
                expected: "click-reveal",
            });
        };
        if !items.iter().any(|i| i.id == item_id) {
            return Err(GateError::UnknownOption(item_id.to_string()));
        }
        if !revealed.insert(item_id.to_string()) {
            return Ok(false);
        }
        if revealed.len() == items.len() && self.resolve_at.is_none() {
            debug!("all items revealed, resolving after delay");
            self.resolve_at = Some(Deadline::after(now_ms, self.delays.reveal_complete_ms));
        }
        Ok(true)
    }

    /// Reports resolution exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now_ms: u64) -> Option<Resolution> {
        if self.resolved {
            return None;
        }
        let deadline = self.resolve_at?;
        if !deadline.is_due(now_ms) {
            return None;
        }
        self.resolved = true;
        Some(Resolution {
            resumes_playback: matches!(self.state, GateState::Choice { .. }),
        })
    }
}
