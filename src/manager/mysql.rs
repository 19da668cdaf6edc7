//! MySQL query manager.
//!
//! Statements are split client-side and executed one at a time. The driver's
//! result stream holds a mutable borrow of the connection for its whole
//! lifetime, so each statement's rows are buffered before iteration begins.
//! Statements that yield no row packets are reported as returning no records;
//! the text protocol does not distinguish them from zero-row selects.

use super::QueryManager;
use crate::error::{FetchError, FetchResult, SqlError, SqlResult};
use crate::query::Query;
use crate::record::{CellValue, Row};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Column, Either, Executor, Row as _, TypeInfo};
use std::collections::VecDeque;

pub struct MySqlManager<'a> {
    conn: &'a mut MySqlConnection,
    statements: Vec<String>,
    current: usize,
    columns: Vec<String>,
    rows: Option<VecDeque<Row>>,
    errored: bool,
}

impl<'a> MySqlManager<'a> {
    pub fn new(conn: &'a mut MySqlConnection, query: &Query) -> Self {
        Self {
            conn,
            statements: query.statements(),
            current: 0,
            columns: Vec::new(),
            rows: None,
            errored: false,
        }
    }

    fn fail(&mut self, err: sqlx::Error) -> FetchError {
        self.errored = true;
        FetchError::Query(SqlError::Query(err.to_string()))
    }

    /// Execute the next statement and buffer its row packets.
    async fn open_statement(&mut self) -> FetchResult<()> {
        let sql = self.statements[self.current].clone();
        self.current += 1;

        let mut buffered = VecDeque::new();
        let mut columns: Option<Vec<String>> = None;
        {
            let mut stream = self.conn.fetch_many(sqlx::raw_sql(&sql));
            loop {
                match stream.try_next().await {
                    Ok(Some(Either::Right(row))) => {
                        if columns.is_none() {
                            columns = Some(column_names(&row));
                        }
                        buffered.push_back(row_to_row(&row));
                    }
                    Ok(Some(Either::Left(_))) => {}
                    Ok(None) => break,
                    Err(e) => {
                        drop(stream);
                        return Err(self.fail(e));
                    }
                }
            }
        }

        match columns {
            Some(columns) => {
                self.columns = columns;
                self.rows = Some(buffered);
                Ok(())
            }
            None => {
                self.columns.clear();
                Err(FetchError::ReturnsNoRecords)
            }
        }
    }
}

impl QueryManager for MySqlManager<'_> {
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
            self.open_statement().await?;
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
        Ok(())
    }
}

pub(crate) fn column_names(row: &MySqlRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Convert a driver row with a decode fallback chain per cell: integers,
/// floats, decimals, temporal types, text, then raw bytes.
pub(crate) fn row_to_row(row: &MySqlRow) -> Row {
    Row::new((0..row.columns().len()).map(|i| extract_cell(row, i)).collect())
}

fn extract_cell(row: &MySqlRow, idx: usize) -> CellValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return match v {
            Some(v) => CellValue::Integer(v),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return match v {
            Some(v) => CellValue::Integer(v as i64),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return match v {
            Some(v) => CellValue::Float(v),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return match v {
            Some(v) => CellValue::Float(v as f64),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<Decimal>, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return match v {
            Some(v) => CellValue::Binary(v),
            None => CellValue::Null,
        };
    }

    let type_name = row
        .columns()
        .get(idx)
        .map_or("unknown", |c| c.type_info().name());
    CellValue::Text(format!("<unable to display: {}>", type_name))
}
