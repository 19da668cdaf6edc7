//! Common test utilities and helpers
//!
//! Recording doubles for the prompt and renderer collaborators, plus a
//! scripted query manager for driving the spooling protocol without a
//! database.

use omnisql::error::{FetchError, FetchResult, SqlError, SqlResult};
use omnisql::manager::QueryManager;
use omnisql::record::Row;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Prompt double that records every interaction.
#[derive(Default)]
pub struct RecordingPrompt {
    pub tables: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<String>>,
    pub sql_messages: Mutex<Vec<String>>,
    pub progress_lines: Mutex<Vec<String>>,
    pub clears: Mutex<usize>,
}

impl omnisql::prompt::Prompt for RecordingPrompt {
    fn display_progress(&self, _glyph: char, text: &str) {
        self.progress_lines.lock().push(text.to_string());
    }

    fn clear_progress(&self) {
        *self.clears.lock() += 1;
    }

    fn display_table(&self, rendered: &str) {
        self.tables.lock().push(rendered.to_string());
    }

    fn display_message_sql(&self, text: &str) {
        self.sql_messages.lock().push(text.to_string());
    }

    fn display_info(&self, text: &str) {
        self.infos.lock().push(text.to_string());
    }

    fn hide_cursor(&self) {}

    fn show_cursor(&self) {}
}

/// One scripted record set for the scripted manager.
pub enum ScriptedSet {
    /// Yields the rows, then ends normally
    Records { columns: Vec<String>, rows: Vec<Row> },
    /// A statement that produces no records at all
    NoRecords,
    /// Yields the rows, then fails with a query error
    FailsAfter {
        columns: Vec<String>,
        rows: Vec<Row>,
        message: String,
    },
}

enum Mode {
    Idle,
    Rows,
    NoRecords,
    FailAfterRows(String),
}

/// Query manager double driven by a script instead of a database.
pub struct ScriptedManager {
    pending: VecDeque<ScriptedSet>,
    columns: Vec<String>,
    rows: VecDeque<Row>,
    mode: Mode,
    errored: bool,
    pub finish_calls: usize,
}

impl ScriptedManager {
    pub fn new(sets: Vec<ScriptedSet>) -> Self {
        Self {
            pending: sets.into(),
            columns: Vec::new(),
            rows: VecDeque::new(),
            mode: Mode::Idle,
            errored: false,
            finish_calls: 0,
        }
    }
}

impl QueryManager for ScriptedManager {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn has_another_record_set(&mut self) -> SqlResult<bool> {
        if self.errored {
            return Ok(false);
        }
        // a set is still open (e.g. the caller was interrupted mid-fetch)
        if !matches!(self.mode, Mode::Idle) {
            return Ok(true);
        }
        match self.pending.pop_front() {
            Some(ScriptedSet::Records { columns, rows }) => {
                self.columns = columns;
                self.rows = rows.into();
                self.mode = Mode::Rows;
                Ok(true)
            }
            Some(ScriptedSet::NoRecords) => {
                self.columns.clear();
                self.mode = Mode::NoRecords;
                Ok(true)
            }
            Some(ScriptedSet::FailsAfter {
                columns,
                rows,
                message,
            }) => {
                self.columns = columns;
                self.rows = rows.into();
                self.mode = Mode::FailAfterRows(message);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fetch_row(&mut self) -> FetchResult<Row> {
        match &self.mode {
            Mode::Idle => Err(FetchError::RecordSetEnd),
            Mode::NoRecords => {
                self.mode = Mode::Idle;
                Err(FetchError::ReturnsNoRecords)
            }
            Mode::Rows => match self.rows.pop_front() {
                Some(row) => Ok(row),
                None => {
                    self.mode = Mode::Idle;
                    Err(FetchError::RecordSetEnd)
                }
            },
            Mode::FailAfterRows(message) => match self.rows.pop_front() {
                Some(row) => Ok(row),
                None => {
                    let message = message.clone();
                    self.errored = true;
                    self.mode = Mode::Idle;
                    Err(FetchError::Query(SqlError::Query(message)))
                }
            },
        }
    }

    async fn finish(&mut self) -> SqlResult<()> {
        self.finish_calls += 1;
        Ok(())
    }
}
