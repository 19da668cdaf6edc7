//! The session orchestrator.
//!
//! [`SqlBackend`] owns at most one live native connection and drives the
//! whole query lifecycle: alias resolution and URL parsing at connect, query
//! manager selection per dialect, the spooling protocol with its progress
//! monitor, and structure discovery through the inspector. Queries are minted
//! by the backend and carry its id; executing a foreign query is refused.

use crate::connection::NativeConnection;
use crate::dialect::{Dialect, ManagerKind, required_packages_for_dialect};
use crate::error::{FetchError, SqlError, SqlResult};
use crate::inspect::Inspector;
use crate::manager::{
    DefaultManager, MsSqlManager, MySqlManager, OracleManager, PostgresManager, QueryManager,
    SqliteManager,
};
use crate::prompt::Prompt;
use crate::query::Query;
use crate::record::{RecordSet, Row};
use crate::spool::SpoolMonitor;
use crate::structure::SqlStructure;
use crate::table::TableRenderer;
use crate::url::ConnectionUrl;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

static NEXT_BACKEND_ID: AtomicU64 = AtomicU64::new(1);

/// Connection status snapshot for the `status` command and the prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatusDetails {
    pub connected: bool,
    /// `user@host:database`, never containing the password
    pub connection_detail: Option<String>,
    pub dialect: Option<String>,
    /// Server-side session identifier captured at connect
    pub session_id: Option<String>,
}

struct Live {
    url: ConnectionUrl,
    native: NativeConnection,
    session_id: Option<String>,
    inspector: Inspector,
}

pub struct SqlBackend {
    id: u64,
    prompt: Arc<dyn Prompt>,
    renderer: Box<dyn TableRenderer>,
    aliases: HashMap<String, String>,
    interrupt: Arc<AtomicBool>,
    live: Option<Live>,
}

impl SqlBackend {
    pub fn new(
        prompt: Arc<dyn Prompt>,
        renderer: Box<dyn TableRenderer>,
        aliases: HashMap<String, String>,
    ) -> Self {
        Self {
            id: NEXT_BACKEND_ID.fetch_add(1, Ordering::Relaxed),
            prompt,
            renderer,
            aliases,
            interrupt: Arc::new(AtomicBool::new(false)),
            live: None,
        }
    }

    /// Open a connection to an alias or connection URL.
    ///
    /// Fails with `ConnectionExists` if a connection is already open; the
    /// existing session is left untouched.
    pub async fn connect(&mut self, target: &str) -> SqlResult<()> {
        if let Some(live) = &self.live {
            return Err(SqlError::ConnectionExists(live.url.connection_detail()));
        }

        let resolved = self
            .aliases
            .get(target)
            .cloned()
            .unwrap_or_else(|| target.to_string());
        let url = ConnectionUrl::parse(&resolved)?;

        let mut native = NativeConnection::connect(&url).await?;
        let session_id = native.session_id().await;
        tracing::info!(
            dialect = url.dialect.name(),
            session = session_id.as_deref().unwrap_or("-"),
            "connected"
        );

        if url.dialect.manager_kind().is_none() {
            self.prompt.display_info(&format!(
                "No specialized query support for dialect '{}'; using the generic single-result path",
                url.dialect.name()
            ));
        }
        if url.dialect.inspector_kind().is_none() {
            self.prompt.display_info(&format!(
                "No specialized completion support for dialect '{}'; using information_schema discovery",
                url.dialect.name()
            ));
        }

        let mut inspector = Inspector::new(url.clone());
        inspector.start();

        self.live = Some(Live {
            url,
            native,
            session_id,
            inspector,
        });
        Ok(())
    }

    /// Close the connection. A no-op when nothing is connected.
    pub async fn disconnect(&mut self) -> SqlResult<()> {
        if let Some(mut live) = self.live.take() {
            live.inspector.abort();
            live.native.close().await;
            tracing::info!("disconnected");
        }
        Ok(())
    }

    /// Mint a query owned by this backend.
    pub fn make_query(&self, text: &str) -> Query {
        Query::new(text, self.id)
    }

    /// Execute a query, spooling every record set to the prompt as a
    /// rendered table.
    pub async fn execute(&mut self, query: &Query) -> SqlResult<()> {
        if query.backend_id() != self.id {
            return Err(SqlError::BackendMismatch(
                "The query was constructed by a different backend and cannot be executed here"
                    .to_string(),
            ));
        }
        let live = self.live.as_mut().ok_or(SqlError::Disconnected)?;
        self.interrupt.store(false, Ordering::Release);

        match live.url.dialect.manager_kind() {
            Some(ManagerKind::Sqlite) => {
                let NativeConnection::Sqlite { conn } = &mut live.native else {
                    return Err(dialect_connection_mismatch());
                };
                let mut manager = SqliteManager::new(conn, query);
                let spooled = spool_results(
                    Arc::clone(&self.prompt),
                    &*self.renderer,
                    &self.interrupt,
                    &mut manager,
                )
                .await;
                let finished = manager.finish().await;
                spooled?;
                finished?;
            }
            Some(ManagerKind::Postgres) => {
                let NativeConnection::Postgres { client, notices } = &mut live.native else {
                    return Err(dialect_connection_mismatch());
                };
                let mut manager =
                    PostgresManager::new(&*client, notices, Arc::clone(&self.prompt), query);
                let spooled = spool_results(
                    Arc::clone(&self.prompt),
                    &*self.renderer,
                    &self.interrupt,
                    &mut manager,
                )
                .await;
                let finished = manager.finish().await;
                spooled?;
                finished?;
            }
            Some(ManagerKind::MySql) => {
                let NativeConnection::MySql { conn } = &mut live.native else {
                    return Err(dialect_connection_mismatch());
                };
                let mut manager = MySqlManager::new(conn, query);
                let spooled = spool_results(
                    Arc::clone(&self.prompt),
                    &*self.renderer,
                    &self.interrupt,
                    &mut manager,
                )
                .await;
                let finished = manager.finish().await;
                spooled?;
                finished?;
            }
            Some(ManagerKind::Oracle) => {
                let NativeConnection::Oracle { conn } = &mut live.native else {
                    return Err(dialect_connection_mismatch());
                };
                let mut manager = OracleManager::new(conn, Arc::clone(&self.prompt), query);
                let spooled = spool_results(
                    Arc::clone(&self.prompt),
                    &*self.renderer,
                    &self.interrupt,
                    &mut manager,
                )
                .await;
                let finished = manager.finish().await;
                spooled?;
                finished?;
            }
            Some(ManagerKind::MsSql) => {
                let NativeConnection::MsSql { client } = &mut live.native else {
                    return Err(dialect_connection_mismatch());
                };
                let mut manager = MsSqlManager::new(client, query).await?;
                let spooled = spool_results(
                    Arc::clone(&self.prompt),
                    &*self.renderer,
                    &self.interrupt,
                    &mut manager,
                )
                .await;
                let finished = manager.finish().await;
                spooled?;
                finished?;
            }
            Some(ManagerKind::Default) | None => {
                let mut manager = DefaultManager::new(&mut live.native, query.text()).await?;
                let spooled = spool_results(
                    Arc::clone(&self.prompt),
                    &*self.renderer,
                    &self.interrupt,
                    &mut manager,
                )
                .await;
                let finished = manager.finish().await;
                spooled?;
                finished?;
            }
        }

        // T-SQL batches can switch the active database mid-stream (USE ...);
        // re-read the server's idea of it rather than parsing message text
        if live.url.dialect == Dialect::MsSql {
            if let Ok((_, rows)) = live.native.execute_buffered("SELECT DB_NAME()").await {
                if let Some(name) = rows.first().and_then(|row| row.values.first()) {
                    if !name.is_null() {
                        live.url.database = Some(name.display_string());
                    }
                }
            }
        }

        Ok(())
    }

    /// Execute through the buffered path and return the rows of the first
    /// result set without rendering anything. Used for internal queries
    /// (jobs, session lookups).
    pub async fn fetch_results_for(&mut self, query: &Query) -> SqlResult<Vec<Row>> {
        if query.backend_id() != self.id {
            return Err(SqlError::BackendMismatch(
                "The query was constructed by a different backend and cannot be executed here"
                    .to_string(),
            ));
        }
        let live = self.live.as_mut().ok_or(SqlError::Disconnected)?;

        let mut manager = DefaultManager::new(&mut live.native, query.text()).await?;
        let mut rows = Vec::new();
        while manager.has_another_record_set().await? {
            loop {
                match manager.fetch_row().await {
                    Ok(row) => rows.push(row),
                    Err(FetchError::RecordSetEnd) | Err(FetchError::ReturnsNoRecords) => break,
                    Err(FetchError::Query(e)) => return Err(e),
                }
            }
        }
        Ok(rows)
    }

    pub fn get_status(&self) -> SqlStatusDetails {
        match &self.live {
            Some(live) => SqlStatusDetails {
                connected: true,
                connection_detail: Some(live.url.connection_detail()),
                dialect: Some(live.url.dialect.name().to_string()),
                session_id: live.session_id.clone(),
            },
            None => SqlStatusDetails {
                connected: false,
                connection_detail: None,
                dialect: None,
                session_id: None,
            },
        }
    }

    /// Driver packages a dialect needs, keyed by scheme name.
    pub fn required_packages_for_dialect(&self, dialect: &str) -> SqlResult<&'static [&'static str]> {
        required_packages_for_dialect(dialect)
    }

    /// Throw away the completion cache and start a fresh discovery pass.
    pub fn invalidate_completions(&mut self) {
        if let Some(live) = &mut self.live {
            live.inspector.abort();
            live.inspector.start();
        }
    }

    /// True while structure discovery is running in the background.
    pub fn inspecting(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| live.inspector.inspecting())
    }

    /// The latest discovered structure, if any.
    pub fn structure(&self) -> Option<SqlStructure> {
        self.live.as_ref().and_then(|live| live.inspector.structure())
    }

    /// Shared flag a signal handler sets to cancel the running spool.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }
}

fn dialect_connection_mismatch() -> SqlError {
    SqlError::Dialect("live connection does not match the session dialect".to_string())
}

/// Drive one query manager through the spooling protocol.
///
/// Per record set: start a monitor over a fresh row counter, fetch until the
/// set ends, mark done, stop and join the monitor, then render the set if it
/// has columns. The monitor is always stopped and joined before any error
/// (including an interrupt) propagates, so the progress line can never
/// corrupt error output.
pub async fn spool_results<M: QueryManager>(
    prompt: Arc<dyn Prompt>,
    renderer: &dyn TableRenderer,
    interrupt: &AtomicBool,
    manager: &mut M,
) -> SqlResult<Vec<RecordSet>> {
    let mut sets = Vec::new();

    while manager.has_another_record_set().await? {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut records: Vec<Row> = Vec::new();
        let monitor = SpoolMonitor::start(Arc::clone(&prompt), Arc::clone(&counter));

        loop {
            if interrupt.load(Ordering::Acquire) {
                monitor.stop().await;
                return Err(SqlError::Interrupted);
            }
            match manager.fetch_row().await {
                Ok(row) => {
                    records.push(row);
                    counter.store(records.len(), Ordering::Release);
                }
                Err(FetchError::RecordSetEnd) | Err(FetchError::ReturnsNoRecords) => break,
                Err(FetchError::Query(e)) => {
                    monitor.stop().await;
                    return Err(e);
                }
            }
        }

        monitor.set_done();
        monitor.stop().await;

        let columns = manager.columns().to_vec();
        if !columns.is_empty() {
            let set = RecordSet::new(columns, records);
            prompt.display_table(&renderer.construct_table(&set));
            sets.push(set);
        }
    }

    Ok(sets)
}
