//! Oracle query manager.
//!
//! Oracle executes one statement per cursor, so the query is split
//! client-side and each statement becomes one result set. The native driver
//! is blocking; statement results are buffered up front, the same shape as
//! the SQLite manager. Server output written through `dbms_output` is drained
//! and displayed at record-set boundaries.

use super::QueryManager;
use crate::error::{FetchError, FetchResult, SqlError, SqlResult};
use crate::prompt::Prompt;
use crate::query::Query;
use crate::record::{CellValue, Row};
use oracle::sql_type::OracleType;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct OracleManager<'a> {
    conn: &'a oracle::Connection,
    prompt: Arc<dyn Prompt>,
    statements: Vec<String>,
    current: usize,
    columns: Vec<String>,
    rows: Option<VecDeque<Row>>,
    errored: bool,
}

impl<'a> OracleManager<'a> {
    pub fn new(conn: &'a oracle::Connection, prompt: Arc<dyn Prompt>, query: &Query) -> Self {
        // server output stays hidden until the session buffer is enabled
        let _ = conn.execute("BEGIN dbms_output.enable(NULL); END;", &[]);
        Self {
            conn,
            prompt,
            statements: query.statements(),
            current: 0,
            columns: Vec::new(),
            rows: None,
            errored: false,
        }
    }

    fn fail(&mut self, err: oracle::Error) -> FetchError {
        self.errored = true;
        FetchError::Query(SqlError::Query(err.to_string()))
    }

    /// Prepare and fully buffer the next statement's rows.
    fn open_statement(&mut self) -> FetchResult<()> {
        let sql = self.statements[self.current].clone();
        self.current += 1;

        let mut stmt = match self.conn.statement(&sql).build() {
            Ok(stmt) => stmt,
            Err(e) => return Err(self.fail(e)),
        };

        if !stmt.is_query() {
            self.columns.clear();
            return match stmt.execute(&[]) {
                Ok(()) => Err(FetchError::ReturnsNoRecords),
                Err(e) => Err(self.fail(e)),
            };
        }

        let rows = match stmt.query(&[]) {
            Ok(rows) => rows,
            Err(e) => return Err(self.fail(e)),
        };
        let columns: Vec<String> = rows
            .column_info()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let width = columns.len();

        let mut buffered = VecDeque::new();
        for row in rows {
            match row {
                Ok(row) => buffered.push_back(row_values(&row, width)),
                Err(e) => return Err(self.fail(e)),
            }
        }

        self.columns = columns;
        self.rows = Some(buffered);
        Ok(())
    }

    /// Fetch and display pending `dbms_output` lines, one at a time, until
    /// the server buffer runs dry. Output failures are swallowed: the session
    /// may simply lack the privilege, and output must never fail a query.
    fn drain_server_output(&self) {
        let Ok(mut stmt) = self
            .conn
            .statement("BEGIN dbms_output.get_line(:line, :status); END;")
            .build()
        else {
            return;
        };

        loop {
            if stmt
                .execute(&[&OracleType::Varchar2(32767), &OracleType::Int64])
                .is_err()
            {
                return;
            }
            let status: i64 = match stmt.bind_value(2) {
                Ok(status) => status,
                Err(_) => return,
            };
            if status != 0 {
                return;
            }
            let line: Option<String> = match stmt.bind_value(1) {
                Ok(line) => line,
                Err(_) => return,
            };
            self.prompt.display_message_sql(line.as_deref().unwrap_or(""));
        }
    }
}

impl QueryManager for OracleManager<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn has_another_record_set(&mut self) -> SqlResult<bool> {
        self.drain_server_output();
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
        if !self.conn.autocommit() {
            self.conn
                .commit()
                .map_err(|e| SqlError::Query(e.to_string()))?;
        }
        Ok(())
    }
}

/// One-shot buffered execution of a single statement, used by the fallback
/// paths (`fetch_results_for`, session lookups).
pub(crate) fn execute_buffered(
    conn: &oracle::Connection,
    sql: &str,
) -> SqlResult<(Option<Vec<String>>, Vec<Row>)> {
    let mut stmt = conn
        .statement(sql)
        .build()
        .map_err(|e| SqlError::Query(e.to_string()))?;

    if !stmt.is_query() {
        stmt.execute(&[]).map_err(|e| SqlError::Query(e.to_string()))?;
        return Ok((None, Vec::new()));
    }

    let rows = stmt.query(&[]).map_err(|e| SqlError::Query(e.to_string()))?;
    let columns: Vec<String> = rows
        .column_info()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let width = columns.len();

    let mut out = Vec::new();
    for row in rows {
        let row = row.map_err(|e| SqlError::Query(e.to_string()))?;
        out.push(row_values(&row, width));
    }

    Ok((Some(columns), out))
}

fn row_values(row: &oracle::Row, width: usize) -> Row {
    Row::new((0..width).map(|i| extract_cell(row, i)).collect())
}

/// Map one column by its declared Oracle type. NUMBER columns with a zero
/// scale come back as integers; everything without a tighter mapping falls
/// back to the driver's string conversion.
fn extract_cell(row: &oracle::Row, idx: usize) -> CellValue {
    let info = &row.column_info()[idx];
    let cell = match info.oracle_type() {
        OracleType::Number(_, 0) | OracleType::Int64 => row
            .get::<usize, Option<i64>>(idx)
            .map(|v| v.map_or(CellValue::Null, CellValue::Integer)),
        OracleType::Number(..)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => row
            .get::<usize, Option<f64>>(idx)
            .map(|v| v.map_or(CellValue::Null, CellValue::Float)),
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => row
            .get::<usize, Option<Vec<u8>>>(idx)
            .map(|v| v.map_or(CellValue::Null, CellValue::Binary)),
        _ => row
            .get::<usize, Option<String>>(idx)
            .map(|v| v.map_or(CellValue::Null, CellValue::Text)),
    };
    cell.unwrap_or_else(|_| {
        CellValue::Text(format!("<unable to display: {}>", info.oracle_type()))
    })
}
