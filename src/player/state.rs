//! Playback states and the pure pieces of the advance decision.

/// Where the current scene is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
    /// Progress is at 100 but the voice is still talking.
    WaitingForNarrationEnd,
    /// Progress is at 100 and the scene's question is unanswered.
    WaitingForInteraction,
    ShowingKeyTakeaway {
        until_ms: u64,
    },
    /// Terminal.
    Complete,
}

impl PlaybackState {
    /// Every state in which the lesson is running, holds included.
    pub fn is_playing(&self) -> bool {
        !matches!(self, PlaybackState::Paused | PlaybackState::Complete)
    }

    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            PlaybackState::WaitingForNarrationEnd
                | PlaybackState::WaitingForInteraction
                | PlaybackState::ShowingKeyTakeaway { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Paused => "paused",
            PlaybackState::Playing => "playing",
            PlaybackState::WaitingForNarrationEnd => "finishing narration",
            PlaybackState::WaitingForInteraction => "waiting for answer",
            PlaybackState::ShowingKeyTakeaway { .. } => "key takeaway",
            PlaybackState::Complete => "complete",
        }
    }
}

/// First condition to look at when deciding whether a scene may advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Check {
    Narration,
    Interaction,
    Takeaway,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Readiness {
    pub narrating: bool,
    pub interaction_blocking: bool,
    pub takeaway_pending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    WaitForNarration,
    WaitForInteraction,
    ShowTakeaway,
    Advance,
}

/// Applies the gating rules in priority order, skipping checks before `from`.
pub fn decide(readiness: Readiness, from: Check) -> Decision {
    if from <= Check::Narration && readiness.narrating {
        Decision::WaitForNarration
    } else if from <= Check::Interaction && readiness.interaction_blocking {
        Decision::WaitForInteraction
    } else if readiness.takeaway_pending {
        Decision::ShowTakeaway
    } else {
        Decision::Advance
    }
}

/// Time played within a scene, recomputed from timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ProgressMeter {
    duration_ms: u64,
    played_ms: u64,
    running_since: Option<u64>,
}

impl ProgressMeter {
    pub(crate) fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            played_ms: 0,
            running_since: None,
        }
    }

    pub(crate) fn resume(&mut self, now_ms: u64) {
        if self.running_since.is_none() {
            self.running_since = Some(now_ms);
        }
    }

    pub(crate) fn hold(&mut self, now_ms: u64) {
        self.played_ms = self.played_ms(now_ms);
        self.running_since = None;
    }

    pub(crate) fn played_ms(&self, now_ms: u64) -> u64 {
        let running = self
            .running_since
            .map_or(0, |since| now_ms.saturating_sub(since));
        (self.played_ms + running).min(self.duration_ms)
    }

    pub(crate) fn percent(&self, now_ms: u64) -> f64 {
        (self.played_ms(now_ms) as f64 * 100.0 / self.duration_ms as f64).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CLEAR: Readiness = Readiness {
        narrating: false,
        interaction_blocking: false,
        takeaway_pending: false,
    };

    #[test]
    fn narration_has_priority() {
        let r = Readiness {
            narrating: true,
            interaction_blocking: true,
            takeaway_pending: true,
        };
        assert_eq!(decide(r, Check::Narration), Decision::WaitForNarration);
        assert_eq!(decide(r, Check::Interaction), Decision::WaitForInteraction);
        assert_eq!(decide(r, Check::Takeaway), Decision::ShowTakeaway);
    }

    #[test]
    fn takeaway_then_advance() {
        let r = Readiness {
            takeaway_pending: true,
            ..ALL_CLEAR
        };
        assert_eq!(decide(r, Check::Narration), Decision::ShowTakeaway);
        assert_eq!(decide(ALL_CLEAR, Check::Narration), Decision::Advance);
    }

    #[test]
    fn holds_are_playing_states() {
        assert!(PlaybackState::WaitingForInteraction.is_playing());
        assert!(PlaybackState::ShowingKeyTakeaway { until_ms: 0 }.is_waiting());
        assert!(!PlaybackState::Paused.is_playing());
        assert!(!PlaybackState::Complete.is_playing());
        assert!(!PlaybackState::Playing.is_waiting());
    }

    #[test]
    fn meter_accumulates_across_holds() {
        let mut meter = ProgressMeter::new(10_000);
        meter.resume(0);
        assert_eq!(meter.percent(2_500), 25.0);
        meter.hold(2_500);
        assert_eq!(meter.percent(9_000), 25.0);
        meter.resume(9_000);
        meter.resume(9_500);
        assert_eq!(meter.played_ms(11_500), 5_000);
        assert_eq!(meter.percent(100_000), 100.0);
    }
}
