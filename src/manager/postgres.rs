//! PostgreSQL query manager.
//!
//! The query is split client-side and each statement runs over the extended
//! protocol: prepare first (which also reveals whether the statement returns
//! rows and what its columns are), then stream rows through a portal without
//! buffering the whole result set. Server NOTICE output collected by the
//! connection driver is surfaced between fetches.

use super::QueryManager;
use crate::connection::postgres_query_error;
use crate::error::{FetchError, FetchResult, SqlResult};
use crate::prompt::Prompt;
use crate::query::Query;
use crate::record::{CellValue, Row};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, RowStream};

pub struct PostgresManager<'a> {
    client: &'a Client,
    notices: &'a mut UnboundedReceiver<String>,
    prompt: Arc<dyn Prompt>,
    statements: Vec<String>,
    current: usize,
    columns: Vec<String>,
    types: Vec<Type>,
    stream: Option<Pin<Box<RowStream>>>,
    errored: bool,
}

impl<'a> PostgresManager<'a> {
    pub fn new(
        client: &'a Client,
        notices: &'a mut UnboundedReceiver<String>,
        prompt: Arc<dyn Prompt>,
        query: &Query,
    ) -> Self {
        Self {
            client,
            notices,
            prompt,
            statements: query.statements(),
            current: 0,
            columns: Vec::new(),
            types: Vec::new(),
            stream: None,
            errored: false,
        }
    }

    /// Forward NOTICE text captured by the connection driver to the session.
    fn drain_notices(&mut self) {
        while let Ok(text) = self.notices.try_recv() {
            self.prompt.display_message_sql(&text);
        }
    }

    fn fail(&mut self, err: tokio_postgres::Error) -> FetchError {
        self.errored = true;
        FetchError::Query(postgres_query_error(err))
    }

    async fn open_statement(&mut self) -> FetchResult<()> {
        let sql = self.statements[self.current].clone();
        self.current += 1;

        let stmt = match self.client.prepare(&sql).await {
            Ok(stmt) => stmt,
            Err(e) => return Err(self.fail(e)),
        };

        if stmt.columns().is_empty() {
            let result = self.client.execute(&stmt, &[]).await;
            self.drain_notices();
            self.columns.clear();
            self.types.clear();
            return match result {
                Ok(_) => Err(FetchError::ReturnsNoRecords),
                Err(e) => Err(self.fail(e)),
            };
        }

        self.columns = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        self.types = stmt.columns().iter().map(|c| c.type_().clone()).collect();

        let params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        match self.client.query_raw(&stmt, params).await {
            Ok(stream) => {
                self.stream = Some(Box::pin(stream));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl QueryManager for PostgresManager<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn has_another_record_set(&mut self) -> SqlResult<bool> {
        self.drain_notices();
        Ok(!self.errored && self.current < self.statements.len())
    }

    async fn fetch_row(&mut self) -> FetchResult<Row> {
        if self.stream.is_none() {
            if self.errored || self.current >= self.statements.len() {
                return Err(FetchError::RecordSetEnd);
            }
            self.open_statement().await?;
        }

        let stream = self.stream.as_mut().unwrap();
        match stream.try_next().await {
            Ok(Some(row)) => Ok(extract_row(&row, &self.types)),
            Ok(None) => {
                self.stream = None;
                self.drain_notices();
                Err(FetchError::RecordSetEnd)
            }
            Err(e) => {
                self.stream = None;
                Err(self.fail(e))
            }
        }
    }

    async fn finish(&mut self) -> SqlResult<()> {
        self.stream = None;
        self.drain_notices();
        Ok(())
    }
}

fn extract_row(row: &tokio_postgres::Row, types: &[Type]) -> Row {
    Row::new(
        types
            .iter()
            .enumerate()
            .map(|(idx, ty)| extract_cell(row, idx, ty))
            .collect(),
    )
}

/// Extract one cell with the binary-protocol type, falling back to a string
/// representation when the driver can't decode the declared type.
fn extract_cell(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> CellValue {
    match *ty {
        Type::INT2 => match row.try_get::<_, Option<i16>>(idx) {
            Ok(Some(v)) => CellValue::Integer(v as i64),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::INT4 => match row.try_get::<_, Option<i32>>(idx) {
            Ok(Some(v)) => CellValue::Integer(v as i64),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::INT8 => match row.try_get::<_, Option<i64>>(idx) {
            Ok(Some(v)) => CellValue::Integer(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::OID => match row.try_get::<_, Option<u32>>(idx) {
            Ok(Some(v)) => CellValue::Integer(v as i64),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::FLOAT4 => match row.try_get::<_, Option<f32>>(idx) {
            Ok(Some(v)) => CellValue::Float(v as f64),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::FLOAT8 => match row.try_get::<_, Option<f64>>(idx) {
            Ok(Some(v)) => CellValue::Float(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::NUMERIC => match row.try_get::<_, Option<Decimal>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::BOOL => match row.try_get::<_, Option<bool>>(idx) {
            Ok(Some(v)) => CellValue::Boolean(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::BYTEA => match row.try_get::<_, Option<Vec<u8>>>(idx) {
            Ok(Some(v)) => CellValue::Binary(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::UUID => match row.try_get::<_, Option<uuid::Uuid>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::JSON | Type::JSONB => match row.try_get::<_, Option<serde_json::Value>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::TIMESTAMP => match row.try_get::<_, Option<chrono::NaiveDateTime>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::TIMESTAMPTZ => match row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::DATE => match row.try_get::<_, Option<chrono::NaiveDate>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::TIME => match row.try_get::<_, Option<chrono::NaiveTime>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        _ => try_as_string(row, idx),
    }
}

fn try_as_string(row: &tokio_postgres::Row, idx: usize) -> CellValue {
    match row.try_get::<_, Option<String>>(idx) {
        Ok(Some(v)) => CellValue::Text(v),
        Ok(None) => CellValue::Null,
        Err(_) => {
            let type_name = row
                .columns()
                .get(idx)
                .map_or("unknown", |c| c.type_().name());
            CellValue::Text(format!("<unable to display: {}>", type_name))
        }
    }
}
