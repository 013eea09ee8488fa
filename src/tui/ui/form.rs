//! Patient data input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{
    parse_sex, parse_yes_no, FieldEdit, FieldKind, PatientField, PatientInputs,
};
use crate::tui::styles::HeartTheme;

/// Form field: the clinical field plus its raw text buffer.
///
/// Choice fields hold their selection label (`"No"`, `"Yes"`, `"F"`, `"M"`)
/// or the empty string when unset.
#[derive(Debug, Clone)]
pub struct FormField {
    pub field: PatientField,
    pub value: String,
}

impl FormField {
    /// Choices cycled by Space / Left / Right, ending with "unset".
    fn choices(&self) -> &'static [&'static str] {
        match self.field.kind() {
            FieldKind::YesNo => &["No", "Yes", ""],
            FieldKind::Sex => &["F", "M", ""],
            FieldKind::Integer | FieldKind::Real => &[],
        }
    }

    fn is_choice(&self) -> bool {
        !self.choices().is_empty()
    }

    /// Interpret the buffer as a single-field edit. Unparsable text is unset.
    #[must_use]
    pub fn edit(&self) -> FieldEdit {
        let raw = self.value.trim();
        match self.field.kind() {
            FieldKind::Integer => raw
                .parse::<i64>()
                .map(FieldEdit::Integer)
                .unwrap_or(FieldEdit::Clear),
            FieldKind::Real => raw
                .parse::<f64>()
                .map(FieldEdit::Real)
                .unwrap_or(FieldEdit::Clear),
            FieldKind::YesNo => match parse_yes_no(raw) {
                Ok(Some(flag)) => FieldEdit::Flag(flag),
                _ => FieldEdit::Clear,
            },
            FieldKind::Sex => match parse_sex(raw) {
                Ok(Some(sex)) => FieldEdit::Sex(sex),
                _ => FieldEdit::Clear,
            },
        }
    }

    /// Whether the buffer holds a value the assembler would reject.
    fn is_out_of_range(&self) -> bool {
        if self.value.trim().is_empty() {
            return false;
        }
        match self.edit() {
            FieldEdit::Integer(v) => !self.field.accepts(v as f64),
            FieldEdit::Real(v) => !self.field.accepts(v),
            FieldEdit::Clear => true,
            FieldEdit::Flag(_) | FieldEdit::Sex(_) => false,
        }
    }
}

/// Patient form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    /// Fields highlighted after an incomplete predict action
    pub flagged: Vec<PatientField>,
}

impl Default for PatientFormState {
    fn default() -> Self {
        Self {
            fields: PatientField::ALL
                .iter()
                .map(|&field| FormField {
                    field,
                    value: String::new(),
                })
                .collect(),
            selected_field: 0,
            flagged: Vec::new(),
        }
    }
}

impl PatientFormState {
    /// The field under the cursor
    #[must_use]
    pub fn current(&self) -> &FormField {
        &self.fields[self.selected_field]
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Type a character into the current field.
    ///
    /// Returns `true` if the field changed.
    pub fn input_char(&mut self, c: char) -> bool {
        let current = &mut self.fields[self.selected_field];
        match current.field.kind() {
            FieldKind::Integer if c.is_ascii_digit() || c == '-' => {}
            FieldKind::Real if c.is_ascii_digit() || c == '.' || c == '-' => {}
            FieldKind::YesNo => {
                let label = match c.to_ascii_lowercase() {
                    'y' => "Yes",
                    'n' => "No",
                    _ => return false,
                };
                current.value = label.to_string();
                return true;
            }
            FieldKind::Sex => {
                let label = match c.to_ascii_lowercase() {
                    'm' => "M",
                    'f' => "F",
                    _ => return false,
                };
                current.value = label.to_string();
                return true;
            }
            _ => return false,
        }
        current.value.push(c);
        true
    }

    /// Cycle the selection of a choice field (No -> Yes -> unset -> No).
    ///
    /// Returns `true` if the field changed.
    pub fn cycle_choice(&mut self, forward: bool) -> bool {
        let current = &mut self.fields[self.selected_field];
        if !current.is_choice() {
            return false;
        }
        let choices = current.choices();
        let pos = choices
            .iter()
            .position(|c| *c == current.value)
            .unwrap_or(choices.len() - 1);
        let next = if forward {
            (pos + 1) % choices.len()
        } else {
            (pos + choices.len() - 1) % choices.len()
        };
        current.value = choices[next].to_string();
        true
    }

    /// Delete the last character (choice fields are cleared).
    pub fn delete_char(&mut self) {
        let current = &mut self.fields[self.selected_field];
        if current.is_choice() {
            current.value.clear();
        } else {
            current.value.pop();
        }
    }

    /// Clear the current field
    pub fn clear_field(&mut self) {
        self.fields[self.selected_field].value.clear();
    }

    /// Wipe all field buffers and start over.
    pub fn clear_sensitive(&mut self) {
        for field in self.fields.iter_mut() {
            field.value.zeroize();
        }
        self.flagged.clear();
        self.selected_field = 0;
    }

    /// Snapshot of the whole form.
    #[must_use]
    pub fn to_patient_inputs(&self) -> PatientInputs {
        self.fields
            .iter()
            .fold(PatientInputs::default(), |inputs, f| inputs.with(f.field, f.edit()))
    }

    /// Fill the form from a snapshot.
    pub fn load(&mut self, inputs: &PatientInputs) {
        for form_field in self.fields.iter_mut() {
            form_field.value.zeroize();
            form_field.value = match form_field.field {
                PatientField::Sex => inputs.sex.map(|s| s.code().to_string()).unwrap_or_default(),
                PatientField::SerumCreatinine => inputs
                    .serum_creatinine
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                field => match (field.kind(), inputs.encoded(field)) {
                    (FieldKind::YesNo, Some(v)) => {
                        let label = if v == 1.0 { "Yes" } else { "No" };
                        label.to_string()
                    }
                    (_, Some(v)) => format!("{}", v as i64),
                    (_, None) => String::new(),
                },
            };
        }
        self.flagged.clear();
    }

    /// Load the sample patient (60 y/o male, EF 38%, hypertensive)
    pub fn load_sample_data(&mut self) {
        self.load(&PatientInputs::sample());
    }
}

/// Render the patient data input form
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState, notice: Option<&str>) {
    let block = Block::default()
        .title(Span::styled(" Patient Data Input ", HeartTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(HeartTheme::border());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Fields
            Constraint::Length(2), // Footer / notice
        ])
        .split(inner);

    render_form_fields(f, chunks[0], state);
    render_form_footer(f, chunks[1], notice);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    // Rows of two, in wire order: left column takes even indices.
    let left: Vec<usize> = (0..state.fields.len()).step_by(2).collect();
    let right: Vec<usize> = (1..state.fields.len()).step_by(2).collect();

    render_field_column(f, columns[0], state, &left);
    render_field_column(f, columns[1], state, &right);
}

fn render_field_column(f: &mut Frame, area: Rect, state: &PatientFormState, indices: &[usize]) {
    let constraints: Vec<Constraint> = indices
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (slot, &idx) in indices.iter().enumerate() {
        let field = &state.fields[idx];
        let is_selected = idx == state.selected_field;
        let is_flagged = state.flagged.contains(&field.field);

        let border_style = if is_selected {
            HeartTheme::border_focused()
        } else if is_flagged || field.is_out_of_range() {
            HeartTheme::warning()
        } else {
            HeartTheme::border()
        };

        let title_style = if is_selected {
            HeartTheme::focused()
        } else {
            HeartTheme::text_secondary()
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.field.label()), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value_display = if field.value.is_empty() {
            Span::styled(field.field.hint(), HeartTheme::text_muted())
        } else {
            Span::styled(field.value.as_str(), HeartTheme::text())
        };

        let mut spans = vec![Span::raw(" "), value_display];
        if is_selected {
            spans.push(Span::styled("▌", HeartTheme::cursor()));
            if field.is_choice() {
                spans.push(Span::styled("  ◂ ▸", HeartTheme::text_muted()));
            }
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[slot]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, notice: Option<&str>) {
    let content = if let Some(notice) = notice {
        Line::from(vec![
            Span::styled("! ", HeartTheme::warning()),
            Span::styled(notice.to_string(), HeartTheme::warning()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", HeartTheme::key_hint()),
            Span::styled("Navigate ", HeartTheme::key_desc()),
            Span::styled("[Space] ", HeartTheme::key_hint()),
            Span::styled("Choose ", HeartTheme::key_desc()),
            Span::styled("[Enter] ", HeartTheme::key_hint()),
            Span::styled("Predict ", HeartTheme::key_desc()),
            Span::styled("[^S] ", HeartTheme::key_hint()),
            Span::styled("Sample ", HeartTheme::key_desc()),
            Span::styled("[^R] ", HeartTheme::key_hint()),
            Span::styled("Reset ", HeartTheme::key_desc()),
            Span::styled("[Esc] ", HeartTheme::key_hint()),
            Span::styled("Quit", HeartTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(HeartTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sex;

    fn select(state: &mut PatientFormState, field: PatientField) {
        state.selected_field = field.index();
    }

    #[test]
    fn test_new_form_is_empty() {
        let state = PatientFormState::default();
        assert_eq!(state.fields.len(), 12);
        assert_eq!(state.to_patient_inputs(), PatientInputs::default());
    }

    #[test]
    fn test_sample_round_trips_through_buffers() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        assert_eq!(state.to_patient_inputs(), PatientInputs::sample());
        assert_eq!(state.fields[PatientField::Sex.index()].value, "M");
        assert_eq!(state.fields[PatientField::HighBloodPressure.index()].value, "Yes");
    }

    #[test]
    fn test_numeric_input_filters_characters() {
        let mut state = PatientFormState::default();
        select(&mut state, PatientField::Age);
        assert!(state.input_char('6'));
        assert!(!state.input_char('x'));
        assert!(!state.input_char('.'));
        assert!(state.input_char('0'));
        assert_eq!(state.to_patient_inputs().age, Some(60));

        select(&mut state, PatientField::SerumCreatinine);
        for c in "1.9".chars() {
            state.input_char(c);
        }
        assert_eq!(state.to_patient_inputs().serum_creatinine, Some(1.9));
    }

    #[test]
    fn test_unparsable_text_is_unset() {
        let mut state = PatientFormState::default();
        select(&mut state, PatientField::SerumCreatinine);
        for c in "1..2".chars() {
            state.input_char(c);
        }
        assert_eq!(state.to_patient_inputs().serum_creatinine, None);
    }

    #[test]
    fn test_choice_cycle() {
        let mut state = PatientFormState::default();
        select(&mut state, PatientField::Anaemia);

        assert!(state.cycle_choice(true));
        assert_eq!(state.to_patient_inputs().anaemia, Some(false));
        state.cycle_choice(true);
        assert_eq!(state.to_patient_inputs().anaemia, Some(true));
        state.cycle_choice(true);
        assert_eq!(state.to_patient_inputs().anaemia, None);
        state.cycle_choice(false);
        assert_eq!(state.to_patient_inputs().anaemia, Some(true));

        select(&mut state, PatientField::Sex);
        assert!(state.input_char('m'));
        assert_eq!(state.to_patient_inputs().sex, Some(Sex::Male));
        state.delete_char();
        assert_eq!(state.to_patient_inputs().sex, None);

        select(&mut state, PatientField::Age);
        assert!(!state.cycle_choice(true));
    }

    #[test]
    fn test_out_of_range_buffer_detected() {
        let mut state = PatientFormState::default();
        select(&mut state, PatientField::Platelets);
        for c in "5000".chars() {
            state.input_char(c);
        }
        assert!(state.current().is_out_of_range());
        state.input_char('0');
        assert!(!state.current().is_out_of_range());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = PatientFormState::default();
        state.prev_field();
        assert_eq!(state.selected_field, 11);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }

    #[test]
    fn test_clear_sensitive() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        state.flagged.push(PatientField::Age);
        state.selected_field = 5;
        state.clear_sensitive();
        assert!(state.fields.iter().all(|f| f.value.is_empty()));
        assert!(state.flagged.is_empty());
        assert_eq!(state.selected_field, 0);
    }
}
