//! Text-to-speech as an injected capability.
//!
//! The player only ever talks to a [`Narrator`] through [`NarrationSession`],
//! which enforces "speak at most once per scene" and folds mute and missing
//! voice support into a single "is narrating" answer.

use std::cell::RefCell;
use std::env;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::clock::Clock;

/// Speech engines known to block until the utterance is finished.
const KNOWN_SPEECH_PROGRAMS: [&str; 3] = ["say", "espeak-ng", "espeak"];

pub trait Narrator {
    fn speak(&mut self, text: &str);
    fn stop(&mut self);
    /// Completion is only ever observed through this flag turning false.
    fn is_speaking(&mut self) -> bool;
    fn is_supported(&self) -> bool;
}

impl<N: Narrator + ?Sized> Narrator for Box<N> {
    fn speak(&mut self, text: &str) {
        (**self).speak(text)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_speaking(&mut self) -> bool {
        (**self).is_speaking()
    }

    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }
}

/// No voice available.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn speak(&mut self, _text: &str) {}

    fn stop(&mut self) {}

    fn is_speaking(&mut self) -> bool {
        false
    }

    fn is_supported(&self) -> bool {
        false
    }
}

/// Pretends to speak for a fixed time per word. Useful where no speech engine exists.
#[derive(Clone, Debug)]
pub struct PacedNarrator<C: Clock> {
    clock: C,
    ms_per_word: u64,
    speaking_until: Option<u64>,
}

impl<C: Clock> PacedNarrator<C> {
    pub fn new(clock: C, ms_per_word: u64) -> Self {
        Self {
            clock,
            ms_per_word,
            speaking_until: None,
        }
    }
}

impl<C: Clock> Narrator for PacedNarrator<C> {
    fn speak(&mut self, text: &str) {
        let words = text.split_whitespace().count() as u64;
        self.speaking_until = Some(self.clock.now_ms() + words * self.ms_per_word);
    }

    fn stop(&mut self) {
        self.speaking_until = None;
    }

    fn is_speaking(&mut self) -> bool {
        match self.speaking_until {
            Some(until) if self.clock.now_ms() < until => true,
            Some(_) => {
                self.speaking_until = None;
                false
            }
            None => false,
        }
    }

    fn is_supported(&self) -> bool {
        true
    }
}

/// Runs an external speech program per utterance; speaking while the child lives.
#[derive(Debug)]
pub struct CommandNarrator {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
    supported: bool,
}

impl CommandNarrator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: None,
            supported: true,
        }
    }

    /// Parses "program arg arg"; `None` for a blank command line.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    /// First known speech program found on `PATH`.
    pub fn detect() -> Option<Self> {
        KNOWN_SPEECH_PROGRAMS
            .iter()
            .find(|name| find_on_path(name).is_some())
            .map(|name| Self::new(*name, Vec::new()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

impl Narrator for CommandNarrator {
    fn speak(&mut self, text: &str) {
        self.stop();
        if !self.supported {
            return;
        }
        match Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                debug!(program = %self.program, pid = child.id(), "speech started");
                self.child = Some(child);
            }
            Err(e) => {
                warn!(program = %self.program, "speech program failed to start, voice disabled: {e}");
                self.supported = false;
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn is_speaking(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                self.child = None;
                false
            }
            Err(e) => {
                warn!(program = %self.program, "lost track of speech process: {e}");
                self.child = None;
                false
            }
        }
    }

    fn is_supported(&self) -> bool {
        self.supported
    }
}

impl Drop for CommandNarrator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Default)]
struct FakeNarratorState {
    supported: bool,
    speaking: bool,
    spoken: Vec<String>,
    stops: usize,
}

/// Scriptable narrator for tests. Clones share state, so a test can keep a
/// handle while the player owns another.
#[derive(Clone, Debug)]
pub struct FakeNarrator {
    state: Rc<RefCell<FakeNarratorState>>,
}

impl FakeNarrator {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeNarratorState {
                supported: true,
                ..FakeNarratorState::default()
            })),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeNarratorState::default())),
        }
    }

    /// Simulates the speech engine reaching the end of the utterance.
    pub fn finish(&self) {
        self.state.borrow_mut().speaking = false;
    }

    pub fn speaking(&self) -> bool {
        self.state.borrow().speaking
    }

    pub fn spoken(&self) -> Vec<String> {
        self.state.borrow().spoken.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state.borrow().stops
    }
}

impl Default for FakeNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Narrator for FakeNarrator {
    fn speak(&mut self, text: &str) {
        let mut state = self.state.borrow_mut();
        if state.supported {
            state.spoken.push(text.to_string());
            state.speaking = true;
        }
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.stops += 1;
        state.speaking = false;
    }

    fn is_speaking(&mut self) -> bool {
        self.state.borrow().speaking
    }

    fn is_supported(&self) -> bool {
        self.state.borrow().supported
    }
}

/// Per-scene wrapper around a [`Narrator`].
#[derive(Debug)]
pub struct NarrationSession<N: Narrator> {
    narrator: N,
    started: bool,
    muted: bool,
}

impl<N: Narrator> NarrationSession<N> {
    pub fn new(narrator: N, muted: bool) -> Self {
        Self {
            narrator,
            started: false,
            muted,
        }
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.narrator.stop();
        }
        self.started = false;
    }

    /// Whether narration has been started since the latch was last cleared.
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Starts speaking unless already started for this scene. Returns whether speech began.
    pub fn begin(&mut self, text: &str) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        if self.muted || !self.narrator.is_supported() || text.trim().is_empty() {
            return false;
        }
        debug!(words = text.split_whitespace().count(), "narration started");
        self.narrator.speak(text);
        true
    }

    pub fn stop(&mut self) {
        self.narrator.stop();
    }

    /// Allows `begin` to speak again; used on scene change and explicit play.
    pub fn clear_latch(&mut self) {
        self.started = false;
    }

    /// Unsupported and muted voices never count as speaking.
    pub fn is_narrating(&mut self) -> bool {
        !self.muted && self.narrator.is_supported() && self.narrator.is_speaking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn session_speaks_once_until_latch_cleared() {
        let fake = FakeNarrator::new();
        let mut session = NarrationSession::new(fake.clone(), false);

        assert!(session.begin("hello world"));
        assert!(!session.begin("hello world"));
        assert_eq!(fake.spoken(), vec!["hello world"]);
        assert!(session.is_narrating());

        session.clear_latch();
        assert!(session.begin("again"));
        assert_eq!(fake.spoken().len(), 2);
    }

    #[test]
    fn empty_text_is_not_spoken() {
        let fake = FakeNarrator::new();
        let mut session = NarrationSession::new(fake.clone(), false);
        assert!(!session.begin("   "));
        assert!(fake.spoken().is_empty());
        assert!(!session.is_narrating());
    }

    #[test]
    fn unsupported_voice_never_narrates() {
        let fake = FakeNarrator::unsupported();
        let mut session = NarrationSession::new(fake.clone(), false);
        assert!(!session.begin("hello"));
        assert!(!session.is_narrating());
        assert!(fake.spoken().is_empty());
    }

    #[test]
    fn muting_stops_speech_and_clears_latch() {
        let fake = FakeNarrator::new();
        let mut session = NarrationSession::new(fake.clone(), false);
        session.begin("hello");
        assert!(fake.speaking());

        session.set_muted(true);
        assert!(!fake.speaking());
        assert!(!session.begin("hello"));
        assert!(!session.is_narrating());

        session.set_muted(false);
        assert!(session.begin("hello"));
        assert_eq!(fake.spoken().len(), 2);
    }

    #[test]
    fn finished_speech_is_not_narrating() {
        let fake = FakeNarrator::new();
        let mut session = NarrationSession::new(fake.clone(), false);
        session.begin("hello");
        fake.finish();
        assert!(!session.is_narrating());
    }

    #[test]
    fn paced_narrator_speaks_for_words_times_rate() {
        let clock = ManualClock::new();
        let mut narrator = PacedNarrator::new(clock.clone(), 300);
        narrator.speak("one two three");
        clock.advance(899);
        assert!(narrator.is_speaking());
        clock.advance(1);
        assert!(!narrator.is_speaking());

        narrator.speak("again");
        narrator.stop();
        assert!(!narrator.is_speaking());
    }

    #[test]
    fn command_line_parsing() {
        let narrator = CommandNarrator::from_command_line("espeak -s 150").unwrap();
        assert_eq!(narrator.program(), "espeak");
        assert_eq!(narrator.args, vec!["-s", "150"]);
        assert!(CommandNarrator::from_command_line("   ").is_none());
    }

    #[test]
    fn missing_program_disables_voice() {
        let mut narrator = CommandNarrator::new("sceneplay-no-such-speech-program", vec![]);
        narrator.speak("hello");
        assert!(!narrator.is_supported());
        assert!(!narrator.is_speaking());
    }

    #[cfg(unix)]
    #[test]
    fn command_narrator_tracks_child_process() {
        // `sleep` stands in for a speech program: the text argument is the duration
        let mut narrator = CommandNarrator::new("sleep", vec![]);
        narrator.speak("5");
        assert!(narrator.is_speaking());
        narrator.stop();
        assert!(!narrator.is_speaking());
    }
}
