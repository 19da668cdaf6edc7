//! The prompt collaborator interface.
//!
//! The execution core never writes to the terminal directly; it talks to a
//! [`Prompt`] implementation for progress lines, tables and server-emitted
//! messages. [`TerminalPrompt`] is the stdout implementation; tests use
//! recording doubles.

use crossterm::{cursor, execute, terminal};
use std::io::{Write, stdout};

/// Display surface consumed by the backend and the spool monitor.
///
/// `display_progress` overwrites the current line and must not block;
/// `clear_progress` erases it. `hide_cursor`/`show_cursor` bracket progress
/// display.
pub trait Prompt: Send + Sync {
    /// Overwrite the current line with a spinner glyph and progress text.
    fn display_progress(&self, glyph: char, text: &str);

    /// Erase the progress line.
    fn clear_progress(&self);

    /// Print a fully rendered result table.
    fn display_table(&self, rendered: &str);

    /// Print a message emitted by the server (NOTICE, PRINT, DBMS output).
    fn display_message_sql(&self, text: &str);

    /// Print an informational client-side message.
    fn display_info(&self, text: &str);

    fn hide_cursor(&self);

    fn show_cursor(&self);
}

/// Stdout-backed prompt using crossterm for cursor and line control.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Prompt for TerminalPrompt {
    fn display_progress(&self, glyph: char, text: &str) {
        let mut out = stdout();
        let _ = execute!(out, terminal::Clear(terminal::ClearType::CurrentLine));
        let _ = write!(out, "\r{glyph} {text}");
        let _ = out.flush();
    }

    fn clear_progress(&self) {
        let mut out = stdout();
        let _ = execute!(out, terminal::Clear(terminal::ClearType::CurrentLine));
        let _ = write!(out, "\r");
        let _ = out.flush();
    }

    fn display_table(&self, rendered: &str) {
        println!("{rendered}");
    }

    fn display_message_sql(&self, text: &str) {
        println!("{text}");
    }

    fn display_info(&self, text: &str) {
        println!("{text}");
    }

    fn hide_cursor(&self) {
        let _ = execute!(stdout(), cursor::Hide);
    }

    fn show_cursor(&self) {
        let _ = execute!(stdout(), cursor::Show);
    }
}
