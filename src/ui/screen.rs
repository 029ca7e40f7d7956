use ratatui::Frame;

use crate::{ui::history::render_history, App, AppState};

/// A UI screen boundary, one per app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Grid, HUD and response timer while a session runs
pub struct PlayScreen;

impl Screen for PlayScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Session summary and reaction chart
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }
}

pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Playing => Box::new(PlayScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
