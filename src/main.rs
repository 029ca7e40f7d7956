mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use focustap::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    game::{Game, Move, Phase},
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
    session::SessionConfig,
    stats::StatsDb,
    FocusError,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 50;

/// grid reaction trainer: tap green, hold off on red, hit the centre on blue
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal Go/NoGo reaction trainer. Tap green targets, withhold on red ones, and tap the centre cell when a blue target shows up elsewhere. Sessions are scored, charted and kept in a local history."
)]
pub struct Cli {
    /// grid edge length, 1 to 9 (default 3)
    #[clap(short = 'g', long)]
    grid_size: Option<usize>,

    /// number of rounds per session (default 15)
    #[clap(short = 'r', long)]
    rounds: Option<u32>,

    /// response window per round in milliseconds (default 1500)
    #[clap(short = 't', long)]
    timeout_ms: Option<u64>,

    /// seed the stimulus generator for a reproducible session
    #[clap(long)]
    seed: Option<u64>,

    /// open the session history instead of starting a session
    #[clap(long)]
    history: bool,

    /// write stored sessions to a CSV file and exit
    #[clap(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// don't store this run's results
    #[clap(long)]
    no_save: bool,

    /// delete every stored session and exit
    #[clap(long, conflicts_with = "export_csv")]
    clear_history: bool,
}

impl Cli {
    /// Overlay command line values on the persisted settings
    fn apply(&self, mut config: Config) -> Config {
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(rounds) = self.rounds {
            config.total_rounds = rounds;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Playing,
    Results,
    History,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortBy {
    Played,
    Score,
    HitRate,
    AvgReaction,
}

#[derive(Debug)]
pub struct HistoryState {
    pub scroll_offset: usize,
    pub sort_by: SortBy,
    pub sort_ascending: bool,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            sort_by: SortBy::Played,
            sort_ascending: false,
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub game: Game,
    pub state: AppState,
    pub history_state: HistoryState,
    pub config: Config,
}

impl App {
    pub fn new(config: Config, seed: Option<u64>) -> Result<Self, FocusError> {
        let mut game = Game::new(SessionConfig::from(&config), seed)?;
        if config.save_results {
            match StatsDb::new() {
                Ok(db) => game = game.with_stats_db(db),
                Err(e) => warn!(error = %e, "stats database unavailable, results won't be saved"),
            }
        }

        Ok(Self {
            game,
            state: AppState::Playing,
            history_state: HistoryState::default(),
            config,
        })
    }

    fn leave_history(&mut self, now: Instant) {
        if self.game.is_complete() {
            self.state = AppState::Results;
        } else {
            self.state = AppState::Playing;
            if self.game.phase() == Phase::Idle {
                self.game.start(now);
            }
        }
    }

    fn restart(&mut self, now: Instant) {
        self.game.restart(now);
        self.state = AppState::Playing;
        self.history_state = HistoryState::default();
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if let Some(path) = &cli.export_csv {
        let db = StatsDb::new()?;
        let rows = db.export_csv(path)?;
        println!("exported {rows} sessions to {}", path.display());
        return Ok(());
    }

    if cli.clear_history {
        let db = StatsDb::new()?;
        let removed = db.session_count()?;
        db.clear_all()?;
        println!("removed {removed} stored sessions");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if let Err(e) = SessionConfig::from(&config).validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e).exit();
    }
    if let Err(e) = store.save(&config) {
        warn!(error = %e, path = ?store.path(), "failed to save config");
    }

    let mut run_config = config.clone();
    if cli.no_save {
        run_config.save_results = false;
    }

    let mut app = App::new(run_config, cli.seed)?;
    if cli.history {
        app.state = AppState::History;
    } else {
        app.game.start(Instant::now());
    }
    info!(history = cli.history, seed = ?cli.seed, "focustap starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui(app, f))?;

    loop {
        let event = runner.step();
        let now = Instant::now();
        match event {
            GameEvent::Tick => {
                if app.state != AppState::Playing {
                    continue;
                }
                on_tick(app, now);
            }
            GameEvent::Resize => {}
            GameEvent::Click(col, row) => {
                let size = terminal.size()?;
                let area = Rect::new(0, 0, size.width, size.height);
                handle_click(app, area, col, row, now);
            }
            GameEvent::Key(key) => {
                if handle_key(app, key, now) {
                    break;
                }
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn on_tick(app: &mut App, now: Instant) {
    app.game.on_tick(now);
    if app.game.is_complete() {
        app.state = AppState::Results;
    }
}

/// Map a mouse press to a grid cell using the same layout the play screen draws
fn handle_click(app: &mut App, area: Rect, col: u16, row: u16, now: Instant) {
    if app.state != AppState::Playing {
        return;
    }
    let layout = ui::play_layout(area);
    let cells = ui::grid_cells(layout.grid, app.game.engine().grid_size());
    if let Some(cell) = ui::cell_at(&cells, col, row) {
        app.game.click(cell, now);
    }
}

/// Apply a key press. Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> bool {
    if key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
    {
        return true;
    }

    match app.state {
        AppState::Playing => match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if let Some(cell) = app.game.cell_for_digit(c) {
                    app.game.click(cell, now);
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                app.game.click_cursor(now);
            }
            KeyCode::Up => app.game.move_cursor(Move::Up),
            KeyCode::Down => app.game.move_cursor(Move::Down),
            KeyCode::Left => app.game.move_cursor(Move::Left),
            KeyCode::Right => app.game.move_cursor(Move::Right),
            _ => {}
        },
        AppState::Results => match key.code {
            KeyCode::Char('r') => app.restart(now),
            KeyCode::Char('h') => app.state = AppState::History,
            _ => {}
        },
        AppState::History => match key.code {
            KeyCode::Char('r') => app.restart(now),
            KeyCode::Char('b') | KeyCode::Backspace => app.leave_history(now),
            KeyCode::Up => {
                app.history_state.scroll_offset = app.history_state.scroll_offset.saturating_sub(1);
            }
            KeyCode::Down => {
                // clamped against the table height when rendering
                app.history_state.scroll_offset += 1;
            }
            KeyCode::PageUp => {
                app.history_state.scroll_offset =
                    app.history_state.scroll_offset.saturating_sub(10);
            }
            KeyCode::PageDown => {
                app.history_state.scroll_offset += 10;
            }
            KeyCode::Home => {
                app.history_state.scroll_offset = 0;
            }
            KeyCode::Char(c @ '1'..='4') => {
                app.history_state.sort_by = match c {
                    '1' => SortBy::Played,
                    '2' => SortBy::Score,
                    '3' => SortBy::HitRate,
                    _ => SortBy::AvgReaction,
                };
                app.history_state.scroll_offset = 0;
            }
            KeyCode::Char(' ') => {
                app.history_state.sort_ascending = !app.history_state.sort_ascending;
                app.history_state.scroll_offset = 0;
            }
            _ => {}
        },
    }
    false
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = ui::screen::current_screen(&app.state);
    screen.render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use focustap::StimulusKind;
    use ratatui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app(seed: u64) -> App {
        App {
            game: Game::new(SessionConfig::default(), Some(seed)).unwrap(),
            state: AppState::Playing,
            history_state: HistoryState::default(),
            config: Config::default(),
        }
    }

    fn with_db(mut app: App) -> App {
        app.game = app.game.with_stats_db(StatsDb::open_in_memory().unwrap());
        app
    }

    fn finish(app: &mut App, mut now: Instant) -> Instant {
        while !app.game.is_complete() {
            now += Duration::from_millis(100);
            match app.game.stimulus().cloned() {
                Some(s) if s.kind == StimulusKind::Go => {
                    app.game.click(s.target_cell, now);
                }
                Some(s) if s.kind == StimulusKind::Displaced => {
                    app.game.click(app.game.engine().center_cell(), now);
                }
                _ => {}
            }
            on_tick(app, now);
        }
        now
    }

    fn rendered(app: &mut App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_defaults_leave_config_alone() {
        let cli = Cli::parse_from(["focustap"]);
        assert_eq!(cli.grid_size, None);
        assert_eq!(cli.rounds, None);
        assert_eq!(cli.timeout_ms, None);
        assert!(!cli.history);
        assert!(!cli.no_save);
        assert_eq!(cli.apply(Config::default()), Config::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["focustap", "-g", "4", "-r", "20", "-t", "900", "--seed", "7"]);
        let config = cli.apply(Config::default());
        assert_eq!(config.grid_size, 4);
        assert_eq!(config.total_rounds, 20);
        assert_eq!(config.timeout_ms, 900);
        assert!(config.save_results);
        assert_eq!(cli.seed, Some(7));
    }

    #[test]
    fn test_cli_export_and_flags() {
        let cli = Cli::parse_from([
            "focustap",
            "--export-csv",
            "out.csv",
            "--history",
            "--no-save",
        ]);
        assert_eq!(cli.export_csv, Some(PathBuf::from("out.csv")));
        assert!(cli.history);
        assert!(cli.no_save);
        assert!(!cli.clear_history);
    }

    #[test]
    fn test_cli_clear_history_flag() {
        let cli = Cli::parse_from(["focustap", "--clear-history"]);
        assert!(cli.clear_history);
        assert!(Cli::try_parse_from(["focustap", "--clear-history", "--export-csv", "x.csv"]).is_err());
    }

    #[test]
    fn test_oversized_grid_from_cli_fails_validation() {
        let cli = Cli::parse_from(["focustap", "--grid-size", "65536"]);
        let config = cli.apply(Config::default());
        assert!(matches!(
            SessionConfig::from(&config).validate(),
            Err(FocusError::InvalidGridSize(65536))
        ));
        assert!(App::new(config, Some(1)).is_err());
    }

    #[test]
    fn test_history_state_default() {
        let state = HistoryState::default();
        assert_eq!(state.scroll_offset, 0);
        assert_eq!(state.sort_by, SortBy::Played);
        assert!(!state.sort_ascending);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app(1);
        let now = Instant::now();
        assert!(handle_key(&mut app, key(KeyCode::Esc), now));
        assert!(handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            now
        ));
        assert!(!handle_key(&mut app, key(KeyCode::Char('c')), now));
    }

    #[test]
    fn test_digit_taps_cell() {
        let mut app = test_app(2);
        let now = Instant::now();
        app.game.start(now);
        let target = app.game.stimulus().unwrap().target_cell;
        let digit = char::from_digit(target as u32 + 1, 10).unwrap();

        handle_key(&mut app, key(KeyCode::Char(digit)), now + Duration::from_millis(250));

        let records = app.game.engine().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reaction_ms, Some(250));
    }

    #[test]
    fn test_arrows_and_space_tap_cursor_cell() {
        let mut app = test_app(3);
        let now = Instant::now();
        app.game.start(now);
        handle_key(&mut app, key(KeyCode::Up), now);
        handle_key(&mut app, key(KeyCode::Left), now);
        assert_eq!(app.game.cursor(), 0);

        handle_key(&mut app, key(KeyCode::Char(' ')), now + Duration::from_millis(10));
        assert_eq!(app.game.engine().records().len(), 1);
    }

    #[test]
    fn test_mouse_click_maps_to_grid() {
        let mut app = test_app(4);
        let now = Instant::now();
        app.game.start(now);
        let area = Rect::new(0, 0, 80, 30);
        let cells = ui::grid_cells(ui::play_layout(area).grid, 3);
        let center = cells[4];

        handle_click(&mut app, area, center.x, center.y, now + Duration::from_millis(300));

        assert_eq!(app.game.engine().records().len(), 1);
        assert_eq!(app.game.last_reaction_ms(), Some(300));
    }

    #[test]
    fn test_click_outside_grid_is_ignored() {
        let mut app = test_app(5);
        let now = Instant::now();
        app.game.start(now);
        handle_click(&mut app, Rect::new(0, 0, 80, 30), 0, 0, now);
        assert!(app.game.engine().records().is_empty());
    }

    #[test]
    fn test_results_then_history_then_back() {
        let mut app = with_db(test_app(6));
        let now = finish(&mut app, Instant::now());
        assert_eq!(app.state, AppState::Results);

        handle_key(&mut app, key(KeyCode::Char('h')), now);
        assert_eq!(app.state, AppState::History);

        handle_key(&mut app, key(KeyCode::Char('b')), now);
        assert_eq!(app.state, AppState::Results);
    }

    #[test]
    fn test_restart_from_results() {
        let mut app = test_app(7);
        let now = finish(&mut app, Instant::now());
        handle_key(&mut app, key(KeyCode::Char('r')), now);
        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.game.engine().current_round(), 1);
        assert!(app.game.summary().is_none());
    }

    #[test]
    fn test_history_back_starts_idle_game() {
        let mut app = test_app(8);
        app.state = AppState::History;
        assert_eq!(app.game.phase(), Phase::Idle);

        handle_key(&mut app, key(KeyCode::Backspace), Instant::now());
        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.game.phase(), Phase::Armed);
    }

    #[test]
    fn test_history_sorting_and_scrolling_keys() {
        let mut app = test_app(9);
        app.state = AppState::History;
        let now = Instant::now();

        handle_key(&mut app, key(KeyCode::Down), now);
        handle_key(&mut app, key(KeyCode::PageDown), now);
        assert_eq!(app.history_state.scroll_offset, 11);
        handle_key(&mut app, key(KeyCode::PageUp), now);
        assert_eq!(app.history_state.scroll_offset, 1);
        handle_key(&mut app, key(KeyCode::Home), now);
        assert_eq!(app.history_state.scroll_offset, 0);

        handle_key(&mut app, key(KeyCode::Char('3')), now);
        assert_eq!(app.history_state.sort_by, SortBy::HitRate);
        handle_key(&mut app, key(KeyCode::Char(' ')), now);
        assert!(app.history_state.sort_ascending);
    }

    #[test]
    fn test_history_key_ignored_while_playing() {
        let mut app = test_app(10);
        app.game.start(Instant::now());
        handle_key(&mut app, key(KeyCode::Char('h')), Instant::now());
        assert_eq!(app.state, AppState::Playing);
    }

    #[test]
    fn test_ui_playing_state() {
        let mut app = test_app(11);
        app.game.start(Instant::now());
        let content = rendered(&mut app, 80, 30);
        assert!(content.contains("FocusTap"));
        assert!(content.contains("Round: 1 / 15"));
    }

    #[test]
    fn test_ui_results_state() {
        let mut app = test_app(12);
        finish(&mut app, Instant::now());
        let content = rendered(&mut app, 80, 40);
        assert!(content.contains("Session Complete!"));
        assert!(content.contains("Final Score: 15 / 15"));
    }

    #[test]
    fn test_ui_history_with_data() {
        let mut app = with_db(test_app(13));
        let now = finish(&mut app, Instant::now());
        handle_key(&mut app, key(KeyCode::Char('h')), now);

        let content = rendered(&mut app, 100, 30);
        assert!(content.contains("Session History"));
        assert!(content.contains("Sessions (1)"));
        assert!(content.contains("15 / 15"));
    }

    #[test]
    fn test_ui_history_without_data() {
        let mut app = test_app(14);
        app.state = AppState::History;
        let content = rendered(&mut app, 100, 30);
        assert!(content.contains("No sessions recorded yet"));
    }

    #[test]
    fn test_history_scroll_is_clamped_on_render() {
        let mut app = with_db(test_app(15));
        let now = finish(&mut app, Instant::now());
        app.state = AppState::History;
        app.history_state.scroll_offset = 50;
        let _ = rendered(&mut app, 100, 30);
        assert_eq!(app.history_state.scroll_offset, 0);

        handle_key(&mut app, key(KeyCode::Char('b')), now);
        assert_eq!(app.state, AppState::Results);
    }
}
