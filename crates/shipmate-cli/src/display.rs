//! Console output
//!
//! Messages and tables go to stdout with a styled status symbol, warnings
//! and errors to stderr. Batch progress is an `indicatif` bar on stderr that
//! is suspended while other lines are printed.

use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use shipmate_core::{Reporter, Table};
use std::sync::Mutex;

const BAR_TEMPLATE: &str = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn symbol(&self) -> &'static str {
        match self {
            Level::Info => "▶",
            Level::Success => "✓",
            Level::Warning => "⚠",
            Level::Error => "✗",
        }
    }

    fn styled_symbol(&self) -> StyledObject<&'static str> {
        match self {
            Level::Info => style(self.symbol()).cyan(),
            Level::Success => style(self.symbol()).green(),
            Level::Warning => style(self.symbol()).yellow(),
            Level::Error => style(self.symbol()).red().bold(),
        }
    }
}

/// `Reporter` writing to the terminal
#[derive(Default)]
pub struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the progress bar hidden, if one is showing
    fn suspend<F: FnOnce()>(&self, f: F) {
        match self.bar.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(bar) => bar.suspend(f),
                None => f(),
            },
            Err(_) => f(),
        }
    }

    fn line(&self, level: Level, message: &str) {
        self.suspend(|| match level {
            Level::Warning | Level::Error => {
                eprintln!("{} {}", level.styled_symbol(), message)
            }
            Level::Info | Level::Success => {
                println!("{} {}", level.styled_symbol(), message)
            }
        });
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        self.line(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.line(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.line(Level::Error, message);
    }

    fn success(&self, message: &str) {
        self.line(Level::Success, message);
    }

    fn table(&self, table: &Table) {
        self.suspend(|| print_table(table));
    }

    fn progress(&self, done: usize, total: usize, message: &str) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };

        if done >= total {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
            return;
        }

        let bar = guard.get_or_insert_with(|| new_bar(total));
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        bar.set_message(message.to_string());
    }
}

fn new_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
    if let Ok(bar_style) = ProgressStyle::with_template(BAR_TEMPLATE) {
        bar.set_style(bar_style.progress_chars("=> "));
    }
    bar
}

/// Print a table with a bold title and header row
pub fn print_table(table: &Table) {
    println!();
    if let Some(title) = &table.title {
        println!("{}", style(title).cyan().bold());
    }
    let rendered = render_body(table);
    let mut lines = rendered.lines();
    if let Some(header) = lines.next() {
        println!("  {}", style(header).bold());
    }
    for line in lines {
        println!("  {}", line);
    }
    if table.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    println!();
}

/// Rendered header and rows without the title
fn render_body(table: &Table) -> String {
    let mut untitled = table.clone();
    untitled.title = None;
    untitled.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_body_drops_title() {
        let mut table = Table::new(["Repo", "Tag"]).with_title("Tags to publish");
        table.push_row(["test1", "20220216-0918-develop1"]);
        let body = render_body(&table);
        assert!(body.starts_with("Repo"));
        assert!(!body.contains("Tags to publish"));
        assert_eq!(body.lines().count(), 2);
    }

    #[test]
    fn test_progress_bar_lifecycle() {
        let reporter = ConsoleReporter::new();
        reporter.progress(0, 2, "resolving test1");
        assert!(reporter.bar.lock().unwrap().is_some());
        reporter.progress(2, 2, "resolved");
        assert!(reporter.bar.lock().unwrap().is_none());
    }

    #[test]
    fn test_symbols() {
        assert_eq!(Level::Success.symbol(), "✓");
        assert_eq!(Level::Error.symbol(), "✗");
    }
}
