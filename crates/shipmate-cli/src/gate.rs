//! Interactive confirmation and token prompt

use console::{Term, style};
use shipmate_core::{OperatorGate, Table};
use std::io::BufRead;

use crate::display::print_table;

/// `OperatorGate` reading answers from the terminal
///
/// Anything but an explicit yes declines, including a closed stdin.
#[derive(Debug, Default)]
pub struct TerminalGate;

impl TerminalGate {
    pub fn new() -> Self {
        Self
    }
}

impl OperatorGate for TerminalGate {
    fn confirm(&self, prompt: &str, summary: Option<&Table>) -> bool {
        if let Some(table) = summary {
            print_table(table);
        }

        let term = Term::stderr();
        if term
            .write_str(&format!("{} {} ", style(prompt).bold(), style("[y/N]").dim()))
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                tracing::debug!(error = %e, "could not read confirmation");
                false
            }
        }
    }

    fn provide_token(&self) -> Option<String> {
        if !console::user_attended_stderr() {
            return None;
        }
        match rpassword::prompt_password("GitHub token (leave empty to skip): ") {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::debug!(error = %e, "could not read token");
                None
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
