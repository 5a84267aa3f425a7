//! Output and operator interaction ports
//!
//! Components never print or prompt directly. They report through a
//! [`Reporter`] and ask for approval through an [`OperatorGate`]; the CLI
//! provides terminal implementations and tests use the recording fakes here.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A titled table of rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: None,
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a row; short rows are padded with empty cells
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), String::new());
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of each column, the widest of header and cells
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Plain text rendering with aligned columns
    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push('\n');
        }
        out.push_str(&line(&self.headers));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

/// Sink for user facing output
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn success(&self, message: &str);
    fn table(&self, table: &Table);

    /// Batch progress; `done == total` ends the batch
    fn progress(&self, done: usize, total: usize, message: &str);
}

/// Operator approval and credential source
pub trait OperatorGate: Send + Sync {
    /// Ask the operator to approve `prompt`, showing `summary` if given
    fn confirm(&self, prompt: &str, summary: Option<&Table>) -> bool;

    /// Ask the operator for an access token; `None` if none was entered
    fn provide_token(&self) -> Option<String>;
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn table(&self, _table: &Table) {}
    fn progress(&self, _done: usize, _total: usize, _message: &str) {}
}

/// One event captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Info(String),
    Warn(String),
    Error(String),
    Success(String),
    Table(Table),
    Progress { done: usize, total: usize },
}

/// Reporter that keeps every event for inspection
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Every table reported so far
    pub fn tables(&self) -> Vec<Table> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Table(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Every warning reported so far
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Warn(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        self.push(ReportEvent::Info(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.push(ReportEvent::Warn(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(ReportEvent::Error(message.to_string()));
    }

    fn success(&self, message: &str) {
        self.push(ReportEvent::Success(message.to_string()));
    }

    fn table(&self, table: &Table) {
        self.push(ReportEvent::Table(table.clone()));
    }

    fn progress(&self, done: usize, total: usize, _message: &str) {
        self.push(ReportEvent::Progress { done, total });
    }
}

/// Gate answering from a script
///
/// Answers are consumed in order; once the script runs out every further
/// confirmation is declined. Every prompt is kept for inspection.
#[derive(Debug, Default)]
pub struct ScriptedGate {
    answers: Mutex<VecDeque<bool>>,
    token: Option<String>,
    prompts: Mutex<Vec<(String, Option<Table>)>>,
}

impl ScriptedGate {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            token: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Prompts seen so far, with the summary shown for each
    pub fn prompts(&self) -> Vec<(String, Option<Table>)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl OperatorGate for ScriptedGate {
    fn confirm(&self, prompt: &str, summary: Option<&Table>) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.to_string(), summary.cloned()));
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or(false)
    }

    fn provide_token(&self) -> Option<String> {
        self.token.clone()
    }
}
