//! Dashboard which renders to the log

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use std::fmt;

// Internal
use crate::eqpt::Dashboard;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Logs dashboard lines, only when a line changes.
#[derive(Debug, Default)]
pub struct LogDashboard {
    lines: Vec<String>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(|s| s.as_str())
    }
}

impl Dashboard for LogDashboard {
    fn display_printf(&mut self, line: usize, args: fmt::Arguments) {
        if self.lines.len() <= line {
            self.lines.resize(line + 1, String::new());
        }

        let text = args.to_string();

        if self.lines[line] != text {
            debug!("[{}] {}", line, text);
            self.lines[line] = text;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lines() {
        let mut dash = LogDashboard::new();
        dash.display_printf(2, format_args!("State: {}", "DONE"));

        assert_eq!(dash.line(2), Some("State: DONE"));
        assert_eq!(dash.line(0), Some(""));
        assert_eq!(dash.line(3), None);
    }
}
