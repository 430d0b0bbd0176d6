mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::KeyEvent,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs,
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};
use time_humanize::HumanTime;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sceneplay::{
    app_dirs::AppDirs,
    catalog,
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore, VoiceSetting},
    history::{HistoryDb, LessonRun},
    lesson::{Interaction, Lesson},
    narration::{CommandNarrator, Narrator, PacedNarrator, SilentNarrator},
    player::{Notice, Player},
    runtime::{Control, CrosstermEventSource, FixedTicker, PlayerEvent, PlayerEventSource, Runner, Ticker},
    LessonError,
};

const DEFAULT_LESSON: &str = "intro";
const HISTORY_LIMIT: usize = 10;

/// narrated, interactive lessons in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Plays narrated lessons scene by scene with karaoke subtitles, questions that wait for an answer, and key takeaways between scenes."
)]
pub struct Cli {
    /// lesson file (json) to play; defaults to the bundled introduction
    #[clap(value_name = "LESSON", conflicts_with = "bundled")]
    lesson: Option<PathBuf>,

    /// play a lesson bundled with the binary (see --list)
    #[clap(short = 'b', long)]
    bundled: Option<String>,

    /// list bundled lessons and exit
    #[clap(long)]
    list: bool,

    /// show recently completed lessons and exit
    #[clap(long)]
    history: bool,

    /// start with the narrator muted
    #[clap(short = 'm', long)]
    mute: bool,

    /// narrator backend
    #[clap(long, value_enum)]
    voice: Option<VoiceSetting>,

    /// speech program and arguments, e.g. "espeak -s 160"; implies --voice command
    #[clap(long)]
    voice_command: Option<String>,

    /// persist the effective voice settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Layers the session flags over the stored settings.
    fn apply_to(&self, mut config: Config) -> Config {
        if self.mute {
            config.muted = true;
        }
        if let Some(command) = &self.voice_command {
            config.voice_command = Some(command.clone());
            config.voice = VoiceSetting::Command;
        }
        if let Some(voice) = self.voice {
            config.voice = voice;
        }
        config
    }

    fn load_lesson(&self, min_scene_seconds: f64) -> Result<Lesson, LessonError> {
        match (&self.lesson, &self.bundled) {
            (Some(path), _) => Lesson::from_path(path, min_scene_seconds),
            (None, Some(name)) => catalog::load(name, min_scene_seconds),
            (None, None) => catalog::load(DEFAULT_LESSON, min_scene_seconds),
        }
    }
}

fn build_narrator(config: &Config) -> Box<dyn Narrator> {
    let ms_per_word = (config.timings.max_seconds_per_word * 1000.0).round() as u64;
    let paced = || -> Box<dyn Narrator> { Box::new(PacedNarrator::new(SystemClock::new(), ms_per_word)) };

    match config.voice {
        VoiceSetting::Off => Box::new(SilentNarrator),
        VoiceSetting::Paced => paced(),
        VoiceSetting::Command => match config
            .voice_command
            .as_deref()
            .and_then(CommandNarrator::from_command_line)
        {
            Some(narrator) => Box::new(narrator),
            None => {
                warn!("voice set to command but no voice_command configured, using paced narration");
                paced()
            }
        },
        VoiceSetting::Auto => match CommandNarrator::detect() {
            Some(narrator) => {
                info!(program = narrator.program(), "using system speech program");
                Box::new(narrator)
            }
            None => paced(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

pub struct App {
    pub player: Player<Box<dyn Narrator>>,
    pub history: Option<HistoryDb>,
    /// Completions of this lesson recorded before the current run.
    pub previous_runs: usize,
    pub recorded: bool,
}

impl App {
    pub fn new(player: Player<Box<dyn Narrator>>, history: Option<HistoryDb>) -> Self {
        let previous_runs = history
            .as_ref()
            .and_then(|db| db.completions_for(player.lesson().title()).ok())
            .unwrap_or(0);
        Self {
            player,
            history,
            previous_runs,
            recorded: false,
        }
    }

    pub fn on_tick(&mut self, now_ms: u64) {
        self.player.tick(now_ms);
        self.drain_notices();
    }

    pub fn on_key(&mut self, key: KeyEvent, now_ms: u64) -> KeyAction {
        let Some(control) = Control::from_key(&key) else {
            return KeyAction::Continue;
        };

        match control {
            Control::Quit => return KeyAction::Quit,
            Control::TogglePlay => self.player.toggle_play(now_ms),
            Control::ToggleMute => self.player.toggle_mute(),
            Control::Next => {
                self.player.next(now_ms);
            }
            Control::Previous => {
                self.player.previous(now_ms);
            }
            Control::Retry => {
                self.player.retry();
            }
            Control::Pick(index) => self.choose(index, now_ms),
        }
        self.drain_notices();
        KeyAction::Continue
    }

    /// Answers or reveals the n-th entry of the current interaction.
    fn choose(&mut self, index: usize, now_ms: u64) {
        let Some(id) = self.player.gate().id_at(index).map(str::to_string) else {
            return;
        };
        let result = match self.player.scene().interaction {
            Some(Interaction::Choice { .. }) => self.player.select_option(&id, now_ms).map(|_| ()),
            Some(Interaction::ClickReveal { .. }) => self.player.reveal(&id, now_ms).map(|_| ()),
            None => Ok(()),
        };
        if let Err(e) = result {
            debug!("ignoring input for option {id}: {e}");
        }
    }

    fn drain_notices(&mut self) {
        for notice in self.player.take_notices() {
            match notice {
                Notice::SceneChanged(index) => debug!(index, "scene changed"),
                Notice::Completed => self.record_completion(),
            }
        }
    }

    fn record_completion(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        if let Some(db) = &self.history {
            if let Err(e) = db.record_completion(&LessonRun::completed_now(self.player.lesson())) {
                warn!("could not record completion: {e}");
            }
        }
    }
}

/// Logs go to a file in the state dir; the terminal belongs to the TUI.
fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = fs::OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn print_bundled() {
    for name in catalog::list() {
        println!("{name}");
    }
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::open_default()?;
    let runs = db.recent(HISTORY_LIMIT)?;
    if runs.is_empty() {
        println!("no lessons completed yet");
        return Ok(());
    }
    let now = chrono::Local::now();
    for run in runs {
        let since = now.signed_duration_since(run.completed_at).num_seconds().max(0);
        println!(
            "{:<32} {:>3} scenes {:>6.0}s  {}",
            run.title,
            run.scene_count,
            run.total_seconds,
            HumanTime::from_seconds(-since)
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if cli.list {
        print_bundled();
        return Ok(());
    }
    if cli.history {
        return print_history();
    }

    let store = FileConfigStore::new();
    let config = cli.apply_to(store.load());
    if cli.save_config {
        store.save(&config)?;
    }

    let lesson = match cli.load_lesson(config.timings.min_scene_seconds) {
        Ok(lesson) => lesson,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let history = match HistoryDb::open_default() {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("history disabled: {e}");
            None
        }
    };
    let ticker = FixedTicker::for_timings(&config.timings);
    let player = Player::new(lesson, build_narrator(&config), config.timings, config.muted);
    let mut app = App::new(player, history);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), ticker);
    let result = start_tui(&mut terminal, &mut app, &runner, &SystemClock::new());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: PlayerEventSource, T: Ticker, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
    clock: &C,
) -> Result<(), Box<dyn Error>> {
    app.player.play(clock.now_ms());
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match runner.step() {
            PlayerEvent::Tick => app.on_tick(clock.now_ms()),
            PlayerEvent::Resize => {}
            PlayerEvent::Key(key) => {
                if app.on_key(key, clock.now_ms()) == KeyAction::Quit {
                    break;
                }
            }
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}
