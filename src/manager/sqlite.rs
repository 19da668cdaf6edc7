//! SQLite query manager.
//!
//! SQLite has no native multi-statement execution, so the query is split
//! client-side and each statement becomes one result set. Statement results
//! are buffered up front because the native row cursor borrows its prepared
//! statement.

use super::QueryManager;
use crate::error::{FetchError, FetchResult, SqlError, SqlResult};
use crate::query::Query;
use crate::record::{CellValue, Row};
use rusqlite::types::ValueRef;
use std::collections::VecDeque;

pub struct SqliteManager<'a> {
    conn: &'a rusqlite::Connection,
    statements: Vec<String>,
    current: usize,
    columns: Vec<String>,
    rows: Option<VecDeque<Row>>,
    errored: bool,
}

impl<'a> SqliteManager<'a> {
    pub fn new(conn: &'a rusqlite::Connection, query: &Query) -> Self {
        Self {
            conn,
            statements: query.statements(),
            current: 0,
            columns: Vec::new(),
            rows: None,
            errored: false,
        }
    }

    fn fail(&mut self, err: rusqlite::Error) -> FetchError {
        self.errored = true;
        FetchError::Query(SqlError::Query(err.to_string()))
    }

    /// Prepare and fully buffer the next statement's rows.
    fn open_statement(&mut self) -> FetchResult<()> {
        let conn = self.conn;
        let sql = self.statements[self.current].clone();
        self.current += 1;

        let mut stmt = match conn.prepare(&sql) {
            Ok(stmt) => stmt,
            Err(e) => return Err(self.fail(e)),
        };

        if stmt.column_count() == 0 {
            self.columns.clear();
            return match stmt.execute([]) {
                Ok(_) => Err(FetchError::ReturnsNoRecords),
                Err(e) => Err(self.fail(e)),
            };
        }

        self.columns = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = self.columns.len();

        let mut buffered = VecDeque::new();
        let mut rows = match stmt.query([]) {
            Ok(rows) => rows,
            Err(e) => return Err(self.fail(e)),
        };
        loop {
            match rows.next() {
                Ok(Some(row)) => buffered.push_back(row_values(row, width)),
                Ok(None) => break,
                Err(e) => {
                    drop(rows);
                    return Err(self.fail(e));
                }
            }
        }

        self.rows = Some(buffered);
        Ok(())
    }
}

impl QueryManager for SqliteManager<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn has_another_record_set(&mut self) -> SqlResult<bool> {
        Ok(!self.errored && self.current < self.statements.len())
    }

    async fn fetch_row(&mut self) -> FetchResult<Row> {
        if self.rows.is_none() {
            if self.errored || self.current >= self.statements.len() {
                return Err(FetchError::RecordSetEnd);
            }
            self.open_statement()?;
        }
        let buffered = self.rows.as_mut().unwrap();
        match buffered.pop_front() {
            Some(row) => Ok(row),
            None => {
                self.rows = None;
                Err(FetchError::RecordSetEnd)
            }
        }
    }

    async fn finish(&mut self) -> SqlResult<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .map_err(|e| SqlError::Query(e.to_string()))?;
        }
        Ok(())
    }
}

/// One-shot buffered execution of a single statement, used by the fallback
/// paths (`fetch_results_for`, the inspector).
pub(crate) fn execute_buffered(
    conn: &rusqlite::Connection,
    sql: &str,
) -> SqlResult<(Option<Vec<String>>, Vec<Row>)> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SqlError::Query(e.to_string()))?;

    if stmt.column_count() == 0 {
        stmt.execute([]).map_err(|e| SqlError::Query(e.to_string()))?;
        return Ok((None, Vec::new()));
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let width = columns.len();

    let mut out = Vec::new();
    let mut rows = stmt
        .query([])
        .map_err(|e| SqlError::Query(e.to_string()))?;
    while let Some(row) = rows.next().map_err(|e| SqlError::Query(e.to_string()))? {
        out.push(row_values(row, width));
    }

    Ok((Some(columns), out))
}

fn row_values(row: &rusqlite::Row<'_>, width: usize) -> Row {
    Row::new(
        (0..width)
            .map(|i| match row.get_ref(i) {
                Ok(value) => cell_from_value(value),
                Err(_) => CellValue::Null,
            })
            .collect(),
    )
}

fn cell_from_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Integer(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(text) => CellValue::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => CellValue::Binary(blob.to_vec()),
    }
}
