//! Per-dialect query managers.
//!
//! A query manager owns the native cursor state for one executing query and
//! exposes the uniform iteration protocol the spooling loop drives: check
//! `has_another_record_set`, then `fetch_row` until the set ends, repeat.
//! Native driver differences (client-side statement splitting, native
//! multi-result-set cursors, out-of-band server messages) stay behind this
//! trait.

pub mod default;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;

pub use default::DefaultManager;
pub use mssql::MsSqlManager;
pub use mysql::MySqlManager;
pub use oracle::OracleManager;
pub use postgres::PostgresManager;
pub use sqlite::SqliteManager;

use crate::error::{FetchResult, SqlResult};
use crate::record::Row;

/// Uniform iteration protocol over the result sets and rows of one query.
///
/// Callers must consult `has_another_record_set` before fetching from a new
/// set; `fetch_row` on a set that produces no records fails with
/// `ReturnsNoRecords`, and with `RecordSetEnd` once the set's rows are
/// exhausted. Both are loop-termination signals, not failures.
#[allow(async_fn_in_trait)]
pub trait QueryManager {
    /// Column names of the currently active result set; empty when the
    /// active set returns no rows or no set is active yet.
    fn columns(&self) -> &[String];

    /// True if there is a next result set to read. Advancing may skip
    /// column-less sets and mutates `columns` for the newly active set.
    async fn has_another_record_set(&mut self) -> SqlResult<bool>;

    /// Fetch exactly one row from the active set, advancing the native
    /// cursor by one.
    async fn fetch_row(&mut self) -> FetchResult<Row>;

    /// Release the native cursor. Dialects that emulate autocommit at the
    /// manager boundary commit here.
    async fn finish(&mut self) -> SqlResult<()>;
}
