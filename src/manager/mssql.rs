//! SQL Server query manager.
//!
//! T-SQL executes a whole batch natively and interleaves result-set metadata
//! with row tokens on one stream, so no client-side splitting happens here.
//! The manager walks the token stream directly: a metadata token opens the
//! next record set, row tokens belong to the current one. A metadata token
//! encountered while fetching rows is held back and replayed when the caller
//! asks for the next set.

use super::QueryManager;
use crate::error::{FetchError, FetchResult, SqlError, SqlResult};
use crate::query::Query;
use crate::record::{CellValue, Row};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use tiberius::{Client, QueryItem, QueryStream};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

pub struct MsSqlManager<'a> {
    stream: QueryStream<'a>,
    columns: Vec<String>,
    pending: Option<QueryItem>,
    done: bool,
    errored: bool,
}

impl<'a> MsSqlManager<'a> {
    /// Send the whole batch to the server and wrap the resulting token
    /// stream.
    pub async fn new(
        client: &'a mut Client<Compat<TcpStream>>,
        query: &Query,
    ) -> SqlResult<Self> {
        let stream = client
            .simple_query(query.text().to_string())
            .await
            .map_err(error_message)?;

        Ok(Self {
            stream,
            columns: Vec::new(),
            pending: None,
            done: false,
            errored: false,
        })
    }

    async fn next_item(&mut self) -> SqlResult<Option<QueryItem>> {
        match self.stream.try_next().await {
            Ok(item) => Ok(item),
            Err(e) => {
                self.errored = true;
                self.done = true;
                Err(error_message(e))
            }
        }
    }
}

impl QueryManager for MsSqlManager<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn has_another_record_set(&mut self) -> SqlResult<bool> {
        if self.errored {
            return Ok(false);
        }
        match self.pending.take() {
            Some(QueryItem::Metadata(meta)) => {
                self.columns = meta.columns().iter().map(|c| c.name().to_string()).collect();
                return Ok(true);
            }
            Some(item) => {
                // a held-back row means the current set is still open
                self.pending = Some(item);
                return Ok(true);
            }
            None => {}
        }
        if self.done {
            return Ok(false);
        }

        match self.next_item().await? {
            Some(QueryItem::Metadata(meta)) => {
                self.columns = meta.columns().iter().map(|c| c.name().to_string()).collect();
                Ok(true)
            }
            Some(item) => {
                self.pending = Some(item);
                Ok(true)
            }
            None => {
                self.done = true;
                Ok(false)
            }
        }
    }

    async fn fetch_row(&mut self) -> FetchResult<Row> {
        if let Some(item) = self.pending.take() {
            match item {
                QueryItem::Row(row) => return Ok(row_to_row(row)),
                other => {
                    self.pending = Some(other);
                    return Err(FetchError::RecordSetEnd);
                }
            }
        }
        if self.done || self.errored {
            return Err(FetchError::RecordSetEnd);
        }

        match self.next_item().await? {
            Some(QueryItem::Row(row)) => Ok(row_to_row(row)),
            Some(other) => {
                self.pending = Some(other);
                Err(FetchError::RecordSetEnd)
            }
            None => {
                self.done = true;
                Err(FetchError::RecordSetEnd)
            }
        }
    }

    /// Drain the remaining token stream so the connection is reusable.
    async fn finish(&mut self) -> SqlResult<()> {
        self.pending = None;
        while !self.done {
            match self.stream.try_next().await {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => self.done = true,
            }
        }
        Ok(())
    }
}

/// Convert a driver row with a decode fallback chain per cell.
pub(crate) fn row_to_row(row: tiberius::Row) -> Row {
    Row::new((0..row.len()).map(|i| extract_cell(&row, i)).collect())
}

fn extract_cell(row: &tiberius::Row, idx: usize) -> CellValue {
    if let Ok(v) = row.try_get::<&str, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return match v {
            Some(v) => CellValue::Integer(v),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return match v {
            Some(v) => CellValue::Integer(v as i64),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<i16, _>(idx) {
        return match v {
            Some(v) => CellValue::Integer(v as i64),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<u8, _>(idx) {
        return match v {
            Some(v) => CellValue::Integer(v as i64),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<bool, _>(idx) {
        return match v {
            Some(v) => CellValue::Boolean(v),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return match v {
            Some(v) => CellValue::Float(v),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<f32, _>(idx) {
        return match v {
            Some(v) => CellValue::Float(v as f64),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<Decimal, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<uuid::Uuid, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(idx) {
        return match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        };
    }
    if let Ok(v) = row.try_get::<&[u8], _>(idx) {
        return match v {
            Some(v) => CellValue::Binary(v.to_vec()),
            None => CellValue::Null,
        };
    }
    CellValue::Text("<unable to display>".to_string())
}

/// Map a driver error to the query error kind, preferring the server's own
/// error code and message when one exists.
pub(crate) fn error_message(err: tiberius::error::Error) -> SqlError {
    match err {
        tiberius::error::Error::Server(token) => {
            SqlError::Query(format!("[{}] {}", token.code(), token.message()))
        }
        other => SqlError::Query(other.to_string()),
    }
}
