//! Background structure discovery for completions and the object browser.
//!
//! An inspector is constructed first and started second, so the backend can
//! hold a handle before any discovery work runs. The refresh opens its own
//! native connection (discovery must never contend with the user's session)
//! and publishes the finished structure into a shared cache. Discovery
//! failure is non-fatal: the session stays usable, the cache stays stale.

pub mod default;
pub mod keywords;
pub mod mssql;
pub mod postgres;
pub mod sqlite;

use crate::connection::NativeConnection;
use crate::dialect::InspectorKind;
use crate::error::SqlResult;
use crate::record::{CellValue, Row};
use crate::structure::SqlStructure;
use crate::url::ConnectionUrl;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

pub struct Inspector {
    url: ConnectionUrl,
    structure: Arc<RwLock<Option<SqlStructure>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Inspector {
    /// Construct without starting; no connection is opened here.
    pub fn new(url: ConnectionUrl) -> Self {
        Self {
            url,
            structure: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Spawn the background refresh.
    pub fn start(&mut self) {
        let url = self.url.clone();
        let structure = Arc::clone(&self.structure);
        let running = Arc::clone(&self.running);

        running.store(true, Ordering::Release);
        self.handle = Some(tokio::spawn(async move {
            match refresh_structure(&url).await {
                Ok(discovered) => {
                    *structure.write() = Some(discovered);
                }
                Err(e) => {
                    tracing::warn!(
                        dialect = url.dialect.name(),
                        "structure discovery failed: {e}"
                    );
                }
            }
            running.store(false, Ordering::Release);
        }));
    }

    /// True while a refresh is in flight.
    pub fn inspecting(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The most recently published structure, if any refresh has finished.
    pub fn structure(&self) -> Option<SqlStructure> {
        self.structure.read().clone()
    }

    /// Cancel an in-flight refresh, leaving any published structure intact.
    pub fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.running.store(false, Ordering::Release);
    }
}

async fn refresh_structure(url: &ConnectionUrl) -> SqlResult<SqlStructure> {
    let mut conn = NativeConnection::connect(url).await?;
    let result = match url.dialect.inspector_kind() {
        Some(InspectorKind::Postgres) => postgres::refresh(&mut conn).await,
        Some(InspectorKind::Sqlite) => sqlite::refresh(&mut conn).await,
        Some(InspectorKind::MsSql) => mssql::refresh(&mut conn).await,
        Some(InspectorKind::Default) | None => default::refresh(&mut conn, url.dialect).await,
    };
    conn.close().await;
    result
}

/// Display text of one cell, for catalog queries whose cells are all names.
pub(crate) fn cell_text(row: &Row, idx: usize) -> String {
    row.values
        .get(idx)
        .map(CellValue::display_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_construct_does_not_start() {
        let url = ConnectionUrl::parse("sqlite://").unwrap();
        let inspector = Inspector::new(url);
        assert!(!inspector.inspecting());
        assert!(inspector.structure().is_none());
    }

    #[tokio::test]
    async fn test_refresh_publishes_structure() {
        let url = ConnectionUrl::parse("sqlite://").unwrap();
        let mut inspector = Inspector::new(url);
        inspector.start();

        // memory databases are fast, but poll rather than assume
        for _ in 0..100 {
            if !inspector.inspecting() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert!(!inspector.inspecting());
        let structure = inspector.structure().expect("refresh should publish");
        assert!(!structure.keywords.is_empty());
    }
}
