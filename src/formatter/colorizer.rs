//! Terminal colors for exercise output

use nu_ansi_term::{Color, Style};

/// Color scheme for terminal messages
pub struct Colorizer {
    /// Enable colors
    enabled: bool,
}

impl Colorizer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.enabled {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Green
    pub fn success(&self, text: &str) -> String {
        self.paint(Color::Green.bold(), text)
    }

    /// Red, prefixed with `Error: `
    pub fn error(&self, text: &str) -> String {
        self.paint(Color::Red.normal(), &format!("Error: {text}"))
    }

    /// Red without prefix
    pub fn failure(&self, text: &str) -> String {
        self.paint(Color::Red.bold(), text)
    }

    /// Yellow
    pub fn warning(&self, text: &str) -> String {
        self.paint(Color::Yellow.normal(), text)
    }

    /// Cyan, used for headings
    pub fn heading(&self, text: &str) -> String {
        self.paint(Color::Cyan.bold(), text)
    }

    /// Dimmed
    pub fn dim(&self, text: &str) -> String {
        self.paint(Style::new().dimmed(), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorizer_no_colors() {
        let colorizer = Colorizer::new(false);
        let result = colorizer.error("test error");
        assert_eq!(result, "Error: test error");
        assert!(!result.contains('\x1b'));
        assert_eq!(colorizer.heading("Exercise 1"), "Exercise 1");
    }

    #[test]
    fn test_colorizer_with_colors() {
        let colorizer = Colorizer::new(true);
        let result = colorizer.success("PASSED");
        assert!(result.contains('\x1b'));
        assert!(result.contains("PASSED"));
    }
}
