//! Colour palette for the terminal front end.
//!
//! Dark and light variants, plus a guess at the terminal background.

use ratatui::style::Color;

use crate::engine::Severity;

/// Colours used across screens.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub primary: Color,
    pub highlight: Color,
    pub danger: Color,
    pub success: Color,
    pub scanned: Color,
    pub dim: Color,
    pub normal: Color,
    pub inverted_fg: Color,
}

impl Theme {
    /// Deep-space dark palette (default).
    pub fn dark() -> Self {
        Self {
            primary: Color::Cyan,
            highlight: Color::Yellow,
            danger: Color::Red,
            success: Color::Green,
            scanned: Color::LightGreen,
            dim: Color::DarkGray,
            normal: Color::White,
            inverted_fg: Color::Black,
        }
    }

    /// Palette for light terminals.
    pub fn light() -> Self {
        Self {
            primary: Color::Blue,
            highlight: Color::Magenta,
            danger: Color::Red,
            success: Color::Green,
            scanned: Color::DarkGray,
            dim: Color::Gray,
            normal: Color::Black,
            inverted_fg: Color::White,
        }
    }

    /// Pick a palette from the terminal's advertised background.
    pub fn auto() -> Self {
        if is_light_terminal() {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// Colour of a console line.
    pub fn severity(&self, severity: Severity) -> Color {
        match severity {
            Severity::Info => self.normal,
            Severity::System => self.primary,
            Severity::Command => self.highlight,
            Severity::Success => self.success,
            Severity::Failure | Severity::Error => self.danger,
        }
    }
}

/// `COLORFGBG` is "fg;bg"; a background index of 7 or 15 means light.
fn is_light_terminal() -> bool {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|v| v.rsplit(';').next().and_then(|bg| bg.parse::<u32>().ok()))
        .is_some_and(|bg| bg >= 7 && bg != 8)
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_colours() {
        let theme = Theme::dark();
        assert_eq!(theme.severity(Severity::Success), Color::Green);
        assert_eq!(theme.severity(Severity::Error), theme.danger);
        assert_eq!(theme.severity(Severity::Failure), theme.danger);
    }
}
