//! Fallback query manager for dialects without a specialized one.
//!
//! Executes the query in one shot through the connection's buffered path and
//! replays the first result set row by row. Multi-statement queries and
//! secondary result sets are not surfaced on this path.

use super::QueryManager;
use crate::connection::NativeConnection;
use crate::error::{FetchError, FetchResult, SqlResult};
use crate::record::Row;
use std::collections::VecDeque;

pub struct DefaultManager {
    columns: Vec<String>,
    has_columns: bool,
    rows: VecDeque<Row>,
    consumed: bool,
}

impl DefaultManager {
    /// Execute the query eagerly and buffer its first result set.
    pub async fn new(connection: &mut NativeConnection, sql: &str) -> SqlResult<Self> {
        let (columns, rows) = connection.execute_buffered(sql).await?;
        Ok(Self {
            has_columns: columns.is_some(),
            columns: columns.unwrap_or_default(),
            rows: rows.into(),
            consumed: false,
        })
    }
}

impl QueryManager for DefaultManager {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn has_another_record_set(&mut self) -> SqlResult<bool> {
        Ok(!self.consumed)
    }

    async fn fetch_row(&mut self) -> FetchResult<Row> {
        if !self.has_columns {
            self.consumed = true;
            return Err(FetchError::ReturnsNoRecords);
        }
        match self.rows.pop_front() {
            Some(row) => Ok(row),
            None => {
                self.consumed = true;
                Err(FetchError::RecordSetEnd)
            }
        }
    }

    async fn finish(&mut self) -> SqlResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CellValue;
    use crate::url::ConnectionUrl;

    async fn memory_connection() -> NativeConnection {
        let url = ConnectionUrl::parse("sqlite://").unwrap();
        NativeConnection::connect(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_replays_single_result_set() {
        let mut conn = memory_connection().await;
        let mut manager = DefaultManager::new(&mut conn, "SELECT 1 AS n UNION ALL SELECT 2")
            .await
            .unwrap();

        assert!(manager.has_another_record_set().await.unwrap());
        assert_eq!(manager.columns(), ["n"]);
        assert_eq!(
            manager.fetch_row().await.unwrap().values,
            vec![CellValue::Integer(1)]
        );
        assert_eq!(
            manager.fetch_row().await.unwrap().values,
            vec![CellValue::Integer(2)]
        );
        assert!(matches!(
            manager.fetch_row().await,
            Err(FetchError::RecordSetEnd)
        ));
        assert!(!manager.has_another_record_set().await.unwrap());
    }

    #[tokio::test]
    async fn test_statement_without_records() {
        let mut conn = memory_connection().await;
        let mut manager = DefaultManager::new(&mut conn, "CREATE TABLE t (x INTEGER)")
            .await
            .unwrap();

        assert!(manager.has_another_record_set().await.unwrap());
        assert!(manager.columns().is_empty());
        assert!(matches!(
            manager.fetch_row().await,
            Err(FetchError::ReturnsNoRecords)
        ));
        assert!(!manager.has_another_record_set().await.unwrap());
    }
}
