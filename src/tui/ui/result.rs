//! Prediction result panel.

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::domain::{PredictionResult, RiskLevel};
use crate::tui::styles::HeartTheme;

/// Render the result panel: the latest prediction, or a placeholder.
pub fn render_result(
    f: &mut Frame,
    area: Rect,
    result: Option<&PredictionResult>,
    predicted_at: Option<DateTime<Utc>>,
) {
    let block = Block::default()
        .title(Span::styled(" Prediction Result ", HeartTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(match result {
            Some(r) => HeartTheme::risk_level(r.risk_level),
            None => HeartTheme::border(),
        });

    let inner = block.inner(area);
    f.render_widget(block, area);

    match result {
        Some(result) => render_prediction(f, inner, result, predicted_at),
        None => render_placeholder(f, inner),
    }
}

fn render_placeholder(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "No prediction yet",
            HeartTheme::text_secondary(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Fill in all twelve parameters and press [Enter]",
            HeartTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    f.render_widget(content, area);
}

fn render_prediction(
    f: &mut Frame,
    area: Rect,
    result: &PredictionResult,
    predicted_at: Option<DateTime<Utc>>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Risk headline
            Constraint::Length(3), // Probability gauge
            Constraint::Length(2), // Timestamp
            Constraint::Min(0),
        ])
        .margin(1)
        .split(area);

    let risk_style = HeartTheme::risk_level(result.risk_level);
    let icon = match result.risk_level {
        RiskLevel::High => "!",
        RiskLevel::Low => "OK",
    };

    let headline = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{icon} {}", result.risk_level.headline()),
            risk_style,
        )),
        Line::from(""),
        Line::from(Span::styled(
            result.risk_level.description(),
            HeartTheme::text_secondary(),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(headline, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" Probability ", HeartTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(HeartTheme::border()),
        )
        .gauge_style(risk_style)
        .ratio(result.probability.clamp(0.0, 1.0))
        .label(result.probability_percent());
    f.render_widget(gauge, chunks[1]);

    if let Some(at) = predicted_at {
        let stamp = Paragraph::new(Line::from(Span::styled(
            format!(
                "Computed {}",
                at.with_timezone(&Local).format("%H:%M:%S")
            ),
            HeartTheme::text_muted(),
        )))
        .alignment(Alignment::Center);
        f.render_widget(stamp, chunks[2]);
    }
}
