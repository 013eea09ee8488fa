//! Color palette and styles for the terminal front end.
//!
//! Teal/red palette taken from the hero of the web form this replaces,
//! tuned for contrast on dark terminals.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::RiskLevel;

/// Application color palette.
pub struct HeartTheme;

impl HeartTheme {
    // === Brand ===

    /// Teal (#0F6868)
    pub const PRIMARY: Color = Color::Rgb(15, 104, 104);

    /// Light teal for focus
    pub const PRIMARY_LIGHT: Color = Color::Rgb(45, 212, 191); // #2DD4BF

    /// Hero red (#CB5454)
    pub const ACCENT: Color = Color::Rgb(203, 84, 84);

    // === Semantic ===

    /// Low risk card (#0C5460 on light cyan in the web version)
    pub const LOW_RISK: Color = Color::Rgb(16, 185, 129); // #10B981

    /// High risk card
    pub const HIGH_RISK: Color = Color::Rgb(244, 63, 94); // #F43F5E

    pub const WARNING: Color = Color::Rgb(251, 191, 36); // #FBBF24

    // === Text ===

    pub const TEXT_PRIMARY: Color = Color::Rgb(248, 250, 252); // #F8FAFC
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B

    pub const BORDER: Color = Color::Rgb(95, 117, 117); // #5F7575

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn accent() -> Style {
        Style::default().fg(Self::ACCENT).add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(Self::PRIMARY_LIGHT)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY_LIGHT)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Style for a risk headline
    #[must_use]
    pub fn risk_level(level: RiskLevel) -> Style {
        let color = match level {
            RiskLevel::Low => Self::LOW_RISK,
            RiskLevel::High => Self::HIGH_RISK,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}
