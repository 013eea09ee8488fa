//! UI module: View components for the TUI.

pub mod form;
pub mod result;

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::HeartTheme;

/// Hero banner with the classifier in use.
pub fn render_header(f: &mut Frame, area: Rect, classifier: &str) {
    let text = vec![
        Line::from(Span::styled("Heart Failure Prediction", HeartTheme::accent())),
        Line::from(Span::styled(
            "Early detection for a healthier heart",
            HeartTheme::text_secondary(),
        )),
        Line::from(Span::styled(classifier.to_string(), HeartTheme::text_muted())),
    ];

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(HeartTheme::PRIMARY));

    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center),
        area,
    );
}

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![Line::from(vec![Span::styled(
        "DISCLAIMER: Indicative estimate only. Not a substitute for clinical evaluation.",
        HeartTheme::text_muted(),
    )])];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(HeartTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
