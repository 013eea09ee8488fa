//! Main TUI application.
//!
//! Handles:
//! - Input event handling
//! - Keeping the form buffers and the session snapshot in step
//! - Drawing the form, the result panel and the disclaimer

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::ArtifactClassifier;
use crate::application::{PredictionService, Session, SessionOutcome};
use crate::ports::Classifier;

use super::ui::{
    form::{render_patient_form, PatientFormState},
    render_disclaimer, render_header,
    result::render_result,
};

/// Main application state
pub struct App<C: Classifier = ArtifactClassifier> {
    /// Whether the app should quit
    should_quit: bool,

    service: PredictionService<C>,

    /// Authoritative snapshot and prediction cycle
    session: Session,

    /// Raw text buffers behind the snapshot
    form: PatientFormState,
}

impl<C: Classifier> App<C> {
    /// Create the application around an already loaded classifier.
    pub fn with_service(service: PredictionService<C>) -> Self {
        Self {
            should_quit: false,
            service,
            session: Session::new(),
            form: PatientFormState::default(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        // Nothing typed survives the process in memory.
        self.form.clear_sensitive();
        self.session.reset();

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let description = self.service.classifier_description();

        loop {
            terminal.draw(|f| {
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(4),
                        Constraint::Min(0),
                        Constraint::Length(2),
                    ])
                    .split(f.area());

                let body = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
                    .split(rows[1]);

                render_header(f, rows[0], &description);
                render_patient_form(f, body[0], &self.form, self.session.notice());
                render_result(
                    f,
                    body[1],
                    self.session.result(),
                    self.session.predicted_at(),
                );
                render_disclaimer(f, rows[2]);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    pub(crate) fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('q') | KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('s') => self.load_sample(),
                KeyCode::Char('r') => self.reset(),
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::BackTab => self.form.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form.next_field(),
            KeyCode::Enter => self.predict(),
            KeyCode::Char(' ') | KeyCode::Right => {
                if self.form.cycle_choice(true) {
                    self.sync_current_field();
                }
            }
            KeyCode::Left => {
                if self.form.cycle_choice(false) {
                    self.sync_current_field();
                }
            }
            KeyCode::Char(c) => {
                if self.form.input_char(c) {
                    self.sync_current_field();
                }
            }
            KeyCode::Backspace => {
                self.form.delete_char();
                self.sync_current_field();
            }
            KeyCode::Delete => {
                self.form.clear_field();
                self.sync_current_field();
            }
            _ => {}
        }
    }

    /// Push the edited buffer into the session snapshot.
    fn sync_current_field(&mut self) {
        let current = self.form.current();
        self.session.edit(current.field, current.edit());
        self.form.flagged.clear();
    }

    fn load_sample(&mut self) {
        self.form.load_sample_data();
        self.session.replace_inputs(self.form.to_patient_inputs());
        tracing::info!("Sample patient loaded");
    }

    fn reset(&mut self) {
        self.form.clear_sensitive();
        self.session.reset();
        tracing::info!("Form reset");
    }

    fn predict(&mut self) {
        match self.session.trigger_predict(&self.service) {
            SessionOutcome::Incomplete(_) => {
                self.form.flagged = self.session.blocking_fields();
            }
            SessionOutcome::Predicted(_) => {
                self.form.flagged.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prediction::tests::FixedClassifier;
    use crate::application::SessionState;
    use crate::domain::{PatientField, PatientInputs, RiskLevel};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn build_app(label: u8, probabilities: [f64; 2]) -> (App<FixedClassifier>, Arc<FixedClassifier>) {
        let clf = Arc::new(FixedClassifier::new(label, probabilities));
        let app = App::with_service(PredictionService::new(Arc::clone(&clf)));
        (app, clf)
    }

    fn press(app: &mut App<FixedClassifier>, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    fn ctrl(app: &mut App<FixedClassifier>, c: char) {
        app.handle_key(KeyCode::Char(c), KeyModifiers::CONTROL);
    }

    fn type_str(app: &mut App<FixedClassifier>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_updates_session_snapshot() {
        let (mut app, _) = build_app(0, [0.9, 0.1]);
        type_str(&mut app, "72");
        assert_eq!(app.session().inputs().age, Some(72));

        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.session().inputs().age, Some(7));

        press(&mut app, KeyCode::Delete);
        assert_eq!(app.session().inputs().age, None);
    }

    #[test]
    fn test_choice_keys_update_session() {
        let (mut app, _) = build_app(0, [0.9, 0.1]);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.session().inputs().anaemia, Some(false));
        press(&mut app, KeyCode::Right);
        assert_eq!(app.session().inputs().anaemia, Some(true));
        press(&mut app, KeyCode::Left);
        assert_eq!(app.session().inputs().anaemia, Some(false));
    }

    #[test]
    fn test_predict_with_empty_form_flags_every_field() {
        let (mut app, clf) = build_app(1, [0.27, 0.73]);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.session().state(), SessionState::AwaitingInput);
        assert!(app.session().notice().is_some());
        assert_eq!(app.form.flagged.len(), 12);
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);

        // Any edit dismisses the notice and highlights.
        type_str(&mut app, "6");
        assert!(app.session().notice().is_none());
        assert!(app.form.flagged.is_empty());
    }

    #[test]
    fn test_sample_then_predict_shows_result() {
        let (mut app, _) = build_app(1, [0.27, 0.73]);
        ctrl(&mut app, 's');
        assert_eq!(app.session().inputs(), &PatientInputs::sample());

        press(&mut app, KeyCode::Enter);
        let result = app.session().result().copied().expect("result shown");
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.probability_percent(), "73.00%");
        assert_eq!(app.session().state(), SessionState::ResultShown);

        // Ctrl+S does not type into the focused field.
        assert_eq!(app.form.current().value, "60");
    }

    #[test]
    fn test_edit_after_result_returns_to_awaiting_input() {
        let (mut app, _) = build_app(0, [0.8, 0.2]);
        ctrl(&mut app, 's');
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.session().state(), SessionState::ResultShown);

        type_str(&mut app, "1");
        assert_eq!(app.session().state(), SessionState::AwaitingInput);
        assert_eq!(app.session().inputs().age, Some(601));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut app, _) = build_app(1, [0.27, 0.73]);
        ctrl(&mut app, 's');
        press(&mut app, KeyCode::Enter);
        ctrl(&mut app, 'r');

        assert_eq!(app.session().inputs(), &PatientInputs::default());
        assert!(app.session().result().is_none());
        assert!(app.form.fields.iter().all(|f| f.value.is_empty()));
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _) = build_app(0, [0.9, 0.1]);
        type_str(&mut app, "q");
        assert!(!app.should_quit());
        ctrl(&mut app, 'q');
        assert!(app.should_quit());

        let (mut app, _) = build_app(0, [0.9, 0.1]);
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit());
    }

    #[test]
    fn test_out_of_range_value_blocks_prediction() {
        let (mut app, clf) = build_app(1, [0.27, 0.73]);
        ctrl(&mut app, 's');
        for _ in 0..PatientField::Platelets.index() {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Delete);
        type_str(&mut app, "5000");
        press(&mut app, KeyCode::Enter);

        assert!(app.session().result().is_none());
        assert_eq!(app.form.flagged, vec![PatientField::Platelets]);
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);
    }
}
