//! Scene playback state machine.
//!
//! [`Player`] coordinates three independent completion signals into the single
//! decision of when a scene may advance: the progress timer reaching 100%, the
//! narrator no longer speaking, and the scene's interaction being resolved.
//!
//! The host owns the loop. It calls [`Player::tick`] with the current time at
//! least as often as the shortest configured timer period, forwards user input
//! to the control methods, and drains [`Notice`]s to learn about scene changes
//! and completion.

mod state;


pub use state::{decide, Check, Decision, PlaybackState, Readiness};

use tracing::{debug, info};

use crate::clock::Interval;
use crate::config::PlaybackTimings;
use crate::error::GateError;
use crate::gate::{ChoiceOutcome, GateDelays, InteractionGate, Resolution};
use crate::lesson::{Lesson, Scene};
use crate::narration::{NarrationSession, Narrator};
use crate::subtitle::{SubtitlePacing, SubtitleSync};
use state::ProgressMeter;

/// Host notifications, in the order they happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    SceneChanged(usize),
    Completed,
}

/// State that lives exactly as long as one visit to a scene.
#[derive(Clone, Debug)]
struct SceneRun {
    gate: InteractionGate,
    subtitle: SubtitleSync,
    progress: ProgressMeter,
    takeaway_shown: bool,
}

impl SceneRun {
    fn new(scene: &Scene, timings: &PlaybackTimings) -> Self {
        Self {
            gate: InteractionGate::new(scene.interaction.as_ref(), GateDelays::from(timings)),
            subtitle: SubtitleSync::new(
                &scene.narration_text,
                scene.duration_seconds,
                SubtitlePacing::from(timings),
            ),
            progress: ProgressMeter::new(scene.duration_ms()),
            takeaway_shown: false,
        }
    }
}

pub struct Player<N: Narrator> {
    lesson: Lesson,
    timings: PlaybackTimings,
    narration: NarrationSession<N>,
    state: PlaybackState,
    scene_index: usize,
    progress_percent: f64,
    run: SceneRun,
    progress_timer: Option<Interval>,
    subtitle_timer: Option<Interval>,
    notices: Vec<Notice>,
}

impl<N: Narrator> Player<N> {
    pub fn new(lesson: Lesson, narrator: N, timings: PlaybackTimings, muted: bool) -> Self {
        let run = SceneRun::new(&lesson.scenes()[0], &timings);
        Self {
            lesson,
            timings,
            narration: NarrationSession::new(narrator, muted),
            state: PlaybackState::Paused,
            scene_index: 0,
            progress_percent: 0.0,
            run,
            progress_timer: None,
            subtitle_timer: None,
            notices: Vec::new(),
        }
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn scene_index(&self) -> usize {
        self.scene_index
    }

    pub fn scene(&self) -> &Scene {
        &self.lesson.scenes()[self.scene_index]
    }

    /// Progress through the current scene, 0 to 100, updated on progress ticks.
    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_complete(&self) -> bool {
        self.state == PlaybackState::Complete
    }

    pub fn is_muted(&self) -> bool {
        self.narration.is_muted()
    }

    pub fn narrator(&self) -> &N {
        self.narration.narrator()
    }

    pub fn is_narrating(&mut self) -> bool {
        self.narration.is_narrating()
    }

    pub fn gate(&self) -> &InteractionGate {
        &self.run.gate
    }

    pub fn subtitle(&self) -> &SubtitleSync {
        &self.run.subtitle
    }

    /// The takeaway text while its overlay is up.
    pub fn visible_takeaway(&self) -> Option<&str> {
        match self.state {
            PlaybackState::ShowingKeyTakeaway { .. } => self.scene().key_takeaway.as_deref(),
            _ => None,
        }
    }

    pub fn total_duration(&self) -> f64 {
        self.lesson.total_duration()
    }

    /// Seconds of lesson covered so far: finished scenes plus progress in this one.
    pub fn elapsed_seconds(&self) -> f64 {
        if self.is_complete() {
            return self.total_duration();
        }
        let before: f64 = self.lesson.scenes()[..self.scene_index]
            .iter()
            .map(|s| s.duration_seconds)
            .sum();
        before + self.scene().duration_seconds * self.progress_percent / 100.0
    }

    /// Number of live repeating timers; zero whenever playback is stopped.
    pub fn active_timers(&self) -> usize {
        usize::from(self.progress_timer.is_some()) + usize::from(self.subtitle_timer.is_some())
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn play(&mut self, now_ms: u64) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.narration.clear_latch();
        self.set_state(PlaybackState::Playing);
        self.resume_timers(now_ms);
        self.ensure_narration();
        if self.run.progress.percent(now_ms) >= 100.0 {
            self.reach_end_of_scene(now_ms);
        }
    }

    pub fn pause(&mut self, now_ms: u64) {
        if !self.state.is_playing() {
            return;
        }
        self.narration.stop();
        self.stop_timers(now_ms);
        self.set_state(PlaybackState::Paused);
    }

    pub fn toggle_play(&mut self, now_ms: u64) {
        if self.state.is_playing() {
            self.pause(now_ms);
        } else {
            self.play(now_ms);
        }
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.narration.is_muted();
        debug!(muted, "mute toggled");
        self.narration.set_muted(muted);
    }

    /// Skips forward. A no-op on the last scene and after completion.
    pub fn next(&mut self, now_ms: u64) -> bool {
        if self.is_complete() || self.scene_index >= self.lesson.last_index() {
            return false;
        }
        let playing = self.state.is_playing();
        self.enter_scene(self.scene_index + 1, now_ms, playing);
        true
    }

    /// Skips back; on the first scene this restarts it in place.
    pub fn previous(&mut self, now_ms: u64) -> bool {
        if self.is_complete() {
            return false;
        }
        let playing = self.state.is_playing();
        let target = self.scene_index.saturating_sub(1);
        self.enter_scene(target, now_ms, playing);
        true
    }

    pub fn select_option(&mut self, option_id: &str, now_ms: u64) -> Result<ChoiceOutcome, GateError> {
        self.run.gate.select(option_id, now_ms)
    }

    pub fn retry(&mut self) -> bool {
        self.run.gate.retry()
    }

    pub fn reveal(&mut self, item_id: &str, now_ms: u64) -> Result<bool, GateError> {
        self.run.gate.reveal(item_id, now_ms)
    }

    /// Advances every timer to `now_ms` and applies whatever they trigger.
    pub fn tick(&mut self, now_ms: u64) {
        if self.is_complete() {
            return;
        }

        if let Some(resolution) = self.run.gate.poll(now_ms) {
            self.on_gate_resolved(resolution, now_ms);
        }

        match self.state {
            PlaybackState::Playing => {
                self.ensure_narration();
                let fired = self
                    .progress_timer
                    .as_mut()
                    .is_some_and(|timer| timer.poll(now_ms));
                if fired {
                    self.progress_percent = self.run.progress.percent(now_ms);
                    if self.progress_percent >= 100.0 {
                        self.reach_end_of_scene(now_ms);
                    }
                }
            }
            PlaybackState::WaitingForNarrationEnd => {
                if !self.narration.is_narrating() {
                    self.evaluate(Check::Interaction, now_ms);
                }
            }
            PlaybackState::ShowingKeyTakeaway { until_ms } if now_ms >= until_ms => {
                self.advance(now_ms);
            }
            _ => {}
        }

        let poll_subtitle = self
            .subtitle_timer
            .as_mut()
            .is_some_and(|timer| timer.poll(now_ms));
        if poll_subtitle {
            let narrating = self.narration.is_narrating();
            let playing = self.state.is_playing();
            self.run.subtitle.update(now_ms, playing, narrating);
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!(scene = self.scene_index, from = ?self.state, to = ?state, "playback state");
            self.state = state;
        }
    }

    fn ensure_narration(&mut self) {
        if self.state == PlaybackState::Playing && !self.narration.has_started() {
            let text = &self.lesson.scenes()[self.scene_index].narration_text;
            self.narration.begin(text);
        }
    }

    fn resume_timers(&mut self, now_ms: u64) {
        self.run.progress.resume(now_ms);
        self.progress_timer = Some(Interval::start(now_ms, self.timings.progress_tick_ms));
        self.subtitle_timer = Some(Interval::start(now_ms, self.timings.subtitle_poll_ms));
    }

    fn stop_timers(&mut self, now_ms: u64) {
        self.run.progress.hold(now_ms);
        self.progress_timer = None;
        self.subtitle_timer = None;
        self.run.subtitle.reset();
    }

    fn reach_end_of_scene(&mut self, now_ms: u64) {
        self.progress_percent = 100.0;
        self.run.progress.hold(now_ms);
        self.progress_timer = None;
        self.evaluate(Check::Narration, now_ms);
    }

    fn evaluate(&mut self, from: Check, now_ms: u64) {
        let readiness = Readiness {
            narrating: self.narration.is_narrating(),
            interaction_blocking: self.run.gate.is_blocking(),
            takeaway_pending: self.scene().key_takeaway.is_some() && !self.run.takeaway_shown,
        };
        match decide(readiness, from) {
            Decision::WaitForNarration => self.set_state(PlaybackState::WaitingForNarrationEnd),
            Decision::WaitForInteraction => self.set_state(PlaybackState::WaitingForInteraction),
            Decision::ShowTakeaway => {
                self.run.takeaway_shown = true;
                let until_ms = now_ms + self.timings.key_takeaway_dwell_ms;
                self.set_state(PlaybackState::ShowingKeyTakeaway { until_ms });
            }
            Decision::Advance => self.advance(now_ms),
        }
    }

    fn on_gate_resolved(&mut self, resolution: Resolution, now_ms: u64) {
        debug!(scene = self.scene_index, ?resolution, "interaction resolved");
        match self.state {
            PlaybackState::WaitingForInteraction => self.evaluate(Check::Takeaway, now_ms),
            PlaybackState::Paused if resolution.resumes_playback => {
                self.set_state(PlaybackState::Playing);
                self.resume_timers(now_ms);
                if self.run.progress.percent(now_ms) >= 100.0 {
                    self.progress_percent = 100.0;
                    self.run.progress.hold(now_ms);
                    self.progress_timer = None;
                    self.evaluate(Check::Takeaway, now_ms);
                }
            }
            _ => {}
        }
    }

    fn advance(&mut self, now_ms: u64) {
        if self.scene_index < self.lesson.last_index() {
            self.enter_scene(self.scene_index + 1, now_ms, true);
            return;
        }
        self.narration.stop();
        self.stop_timers(now_ms);
        self.progress_percent = 100.0;
        self.set_state(PlaybackState::Complete);
        info!(title = self.lesson.title(), "lesson complete");
        self.notices.push(Notice::Completed);
    }

    fn enter_scene(&mut self, index: usize, now_ms: u64, playing: bool) {
        self.narration.stop();
        self.narration.clear_latch();
        self.progress_timer = None;
        self.subtitle_timer = None;

        let changed = index != self.scene_index;
        self.scene_index = index;
        self.run = SceneRun::new(&self.lesson.scenes()[index], &self.timings);
        self.progress_percent = 0.0;

        if playing {
            self.set_state(PlaybackState::Playing);
            self.resume_timers(now_ms);
            self.ensure_narration();
        } else {
            self.set_state(PlaybackState::Paused);
        }

        if changed {
            info!(scene = index, id = %self.scene().id, "scene changed");
            self.notices.push(Notice::SceneChanged(index));
        }
    }
}

impl<N: Narrator> Drop for Player<N> {
    fn drop(&mut self) {
        self.narration.stop();
    }
}
