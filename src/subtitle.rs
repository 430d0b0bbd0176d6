//! Karaoke subtitle pacing.
//!
//! The narrator never reports per-word timing, so the highlighted word is an
//! estimate: narration is assumed to fill at most a fixed share of the scene,
//! and no word is assumed to take longer than a fixed cap. The cursor is
//! always recomputed from the session start timestamp, never accumulated.

use std::ops::Range;

use crate::config::PlaybackTimings;

/// Guards `floor` against values like 1.9999999999 at exact word boundaries.
const BOUNDARY_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubtitlePacing {
    /// Share of the scene duration narration may occupy.
    pub budget_ratio: f64,
    pub max_seconds_per_word: f64,
    pub lines: usize,
    pub words_per_line: usize,
}

impl SubtitlePacing {
    pub fn max_visible_words(&self) -> usize {
        (self.lines * self.words_per_line).max(1)
    }
}

impl Default for SubtitlePacing {
    fn default() -> Self {
        Self::from(&PlaybackTimings::default())
    }
}

impl From<&PlaybackTimings> for SubtitlePacing {
    fn from(t: &PlaybackTimings) -> Self {
        Self {
            budget_ratio: t.narration_budget_ratio,
            max_seconds_per_word: t.max_seconds_per_word,
            lines: t.subtitle_lines,
            words_per_line: t.subtitle_words_per_line,
        }
    }
}

pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Estimated milliseconds spent on each word, or `None` when there is nothing to say.
pub fn time_per_word_ms(word_count: usize, duration_secs: f64, pacing: &SubtitlePacing) -> Option<f64> {
    if word_count == 0 {
        return None;
    }
    let words = word_count as f64;
    let total_secs = (duration_secs * pacing.budget_ratio).min(words * pacing.max_seconds_per_word);
    Some(total_secs * 1000.0 / words)
}

pub fn word_index_at(elapsed_ms: u64, time_per_word_ms: f64, word_count: usize) -> usize {
    if word_count == 0 {
        return 0;
    }
    let raw = if time_per_word_ms > 0.0 {
        (elapsed_ms as f64 / time_per_word_ms + BOUNDARY_EPSILON).floor() as usize
    } else {
        word_count
    };
    raw.min(word_count - 1)
}

/// Window of at most `max_words` indices, centred on `current` and clamped to both ends.
pub fn visible_range(word_count: usize, current: Option<usize>, max_words: usize) -> Range<usize> {
    let max_words = max_words.max(1);
    let centre = current.unwrap_or(0);
    let start = centre.saturating_sub(max_words / 2);
    let end = (start + max_words).min(word_count);
    let start = end.saturating_sub(max_words);
    start..end
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubtitleWord<'a> {
    pub index: usize,
    pub text: &'a str,
    /// At or before the cursor.
    pub emphasized: bool,
}

/// Word cursor for one scene's narration.
#[derive(Clone, Debug)]
pub struct SubtitleSync {
    words: Vec<String>,
    time_per_word_ms: Option<f64>,
    pacing: SubtitlePacing,
    current: Option<usize>,
    session_start_ms: Option<u64>,
}

impl SubtitleSync {
    pub fn new(narration_text: &str, duration_secs: f64, pacing: SubtitlePacing) -> Self {
        let words = split_words(narration_text);
        let time_per_word_ms = time_per_word_ms(words.len(), duration_secs, &pacing);
        Self {
            words,
            time_per_word_ms,
            pacing,
            current: None,
            session_start_ms: None,
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn time_per_word_ms(&self) -> Option<f64> {
        self.time_per_word_ms
    }

    /// Highlighted word, `None` while nothing is highlighted.
    pub fn current_word(&self) -> Option<usize> {
        self.current
    }

    pub fn is_session_active(&self) -> bool {
        self.session_start_ms.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.session_start_ms = None;
    }

    pub fn update(&mut self, now_ms: u64, playing: bool, narrating: bool) {
        if !playing {
            self.reset();
            return;
        }
        let Some(tpw) = self.time_per_word_ms else {
            return;
        };
        let last = self.words.len() - 1;

        match (narrating, self.session_start_ms) {
            (true, None) => {
                self.session_start_ms = Some(now_ms);
                self.current = Some(0);
            }
            (true, Some(start)) => {
                let index = word_index_at(now_ms.saturating_sub(start), tpw, self.words.len());
                self.current = Some(self.current.map_or(index, |c| c.max(index)));
            }
            (false, Some(_)) => {
                // narration ended: treat the rest of the words as spoken
                self.session_start_ms = None;
                self.current = Some(last);
            }
            (false, None) => {}
        }
    }

    pub fn visible_range(&self) -> Range<usize> {
        visible_range(self.words.len(), self.current, self.pacing.max_visible_words())
    }

    /// The bounded set of words to render; empty while hidden.
    pub fn window(&self) -> Vec<SubtitleWord<'_>> {
        let Some(current) = self.current else {
            return Vec::new();
        };
        self.visible_range()
            .map(|index| SubtitleWord {
                index,
                text: &self.words[index],
                emphasized: index <= current,
            })
            .collect()
    }

    /// The window split into display lines.
    pub fn lines(&self) -> Vec<Vec<SubtitleWord<'_>>> {
        self.window()
            .chunks(self.pacing.words_per_line.max(1))
            .map(<[SubtitleWord]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync(text: &str, secs: f64) -> SubtitleSync {
        SubtitleSync::new(text, secs, SubtitlePacing::default())
    }

    #[test]
    fn splits_on_any_whitespace() {
        assert_eq!(split_words("  one\ttwo \n three  "), vec!["one", "two", "three"]);
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn per_word_cap_wins_for_short_narration() {
        let tpw = time_per_word_ms(3, 10.0, &SubtitlePacing::default()).unwrap();
        assert!((tpw - 350.0).abs() < 1e-6);
    }

    #[test]
    fn scene_budget_wins_for_long_narration() {
        // 100 words in 10s: 8.5s budget beats 35s of per-word cap
        let tpw = time_per_word_ms(100, 10.0, &SubtitlePacing::default()).unwrap();
        assert!((tpw - 85.0).abs() < 1e-6);
    }

    #[test]
    fn empty_narration_has_no_pacing() {
        assert_eq!(time_per_word_ms(0, 10.0, &SubtitlePacing::default()), None);

        let mut s = sync("", 10.0);
        s.update(0, true, true);
        s.update(500, true, true);
        assert_eq!(s.current_word(), None);
        assert!(s.window().is_empty());
    }

    #[test]
    fn cursor_follows_elapsed_time() {
        let mut s = sync("Hello there friend", 10.0);
        assert_eq!(s.current_word(), None);

        s.update(1_000, true, true);
        assert_eq!(s.current_word(), Some(0));

        s.update(1_650, true, true);
        assert_eq!(s.current_word(), Some(1));

        s.update(1_700, true, true);
        assert_eq!(s.current_word(), Some(2));

        s.update(9_000, true, true);
        assert_eq!(s.current_word(), Some(2));
    }

    #[test]
    fn narration_end_freezes_on_last_word() {
        let mut s = sync("one two three four five six", 10.0);
        s.update(0, true, true);
        s.update(400, true, true);
        assert_eq!(s.current_word(), Some(1));

        s.update(450, true, false);
        assert_eq!(s.current_word(), Some(5));

        s.update(5_000, true, false);
        assert_eq!(s.current_word(), Some(5));
    }

    #[test]
    fn stopping_playback_hides_and_restart_begins_at_zero() {
        let mut s = sync("one two three four five six", 10.0);
        s.update(0, true, true);
        s.update(1_000, true, true);
        assert_eq!(s.current_word(), Some(2));

        s.update(1_050, false, true);
        assert_eq!(s.current_word(), None);
        assert!(!s.is_session_active());

        s.update(3_000, true, true);
        assert_eq!(s.current_word(), Some(0));
    }

    #[test]
    fn cursor_never_moves_backwards_in_a_session() {
        let mut s = sync("a b c d e f g h", 10.0);
        s.update(1_000, true, true);
        let mut last = 0;
        for t in (1_000..4_000).step_by(50) {
            s.update(t, true, true);
            let cur = s.current_word().unwrap();
            assert!(cur >= last);
            last = cur;
        }
        // a clock that steps back must not rewind the cursor
        s.update(1_100, true, true);
        assert_eq!(s.current_word(), Some(last));
    }

    #[test]
    fn visible_range_is_centred_and_clamped() {
        assert_eq!(visible_range(10, Some(3), 24), 0..10);
        assert_eq!(visible_range(100, None, 24), 0..24);
        assert_eq!(visible_range(100, Some(5), 24), 0..24);
        assert_eq!(visible_range(100, Some(50), 24), 38..62);
        assert_eq!(visible_range(100, Some(99), 24), 76..100);
        assert_eq!(visible_range(0, Some(0), 24), 0..0);
    }

    #[test]
    fn window_marks_spoken_words() {
        let text = (0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let mut s = sync(&text, 60.0);
        s.update(0, true, true);
        // 40 words, 60s: min(51, 14) = 14s -> 350ms per word
        s.update(350 * 20, true, true);
        assert_eq!(s.current_word(), Some(20));

        let window = s.window();
        assert_eq!(window.len(), 24);
        assert_eq!(window.first().unwrap().index, 8);
        assert_eq!(window.last().unwrap().index, 31);
        assert!(window.iter().filter(|w| w.index <= 20).all(|w| w.emphasized));
        assert!(window.iter().filter(|w| w.index > 20).all(|w| !w.emphasized));

        let lines = s.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.len() == 8));
    }
}
