//! Server-side agent job records and queries (the `jobs` command).
//!
//! Only the T-SQL dialect ships job queries; other dialects get a dialect
//! error. Job identifiers are spliced into the query text (agent procedures
//! do not take bindable parameters on every path), so every spliced value
//! goes through [`escape_literal`] first.

use crate::backend::SqlBackend;
use crate::error::{SqlError, SqlResult};
use crate::record::{CellValue, Row};

/// One agent job and its current status.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlJob {
    pub job_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub enabled: bool,
    pub running: bool,
    pub step_count: i64,
}

/// One step of an agent job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlJobStep {
    pub name: String,
    pub subsystem: String,
    pub database: String,
}

/// Details of a job's most recent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlJobRun {
    pub source: String,
    pub requested: Option<String>,
    pub started: Option<String>,
    pub stopped: Option<String>,
    pub message: Option<String>,
}

const LIST_JOBS: &str = "SELECT \
        a.job_id, a.name, a.description, category = d.name, \
        CAST(a.[enabled] AS BIT) AS is_enabled, \
        CAST(IIF(e.job_id IS NULL, 0, 1) AS BIT) AS is_running, \
        COALESCE(f.step_count, 0) AS step_count \
     FROM msdb.dbo.sysjobs AS a \
     LEFT JOIN msdb.dbo.syscategories AS d ON a.category_id = d.category_id \
     LEFT JOIN ( \
        SELECT DISTINCT job_id FROM msdb.dbo.sysjobactivity \
        WHERE stop_execution_date IS NULL AND start_execution_date IS NOT NULL \
     ) AS e ON a.job_id = e.job_id \
     LEFT JOIN ( \
        SELECT job_id, step_count = COUNT(*) FROM msdb.dbo.sysjobsteps GROUP BY job_id \
     ) AS f ON a.job_id = f.job_id \
     ORDER BY a.name";

const JOB_ID_FOR_NAME: &str = "SELECT job_id FROM msdb.dbo.sysjobs WHERE [name] = '?'";

const JOB_STEPS: &str = "SELECT step_name, subsystem, database_name \
     FROM msdb.dbo.sysjobsteps WHERE job_id = '?' ORDER BY step_id ASC";

const JOB_LAST_RUN: &str = "SELECT \
        COALESCE(c.friendly_name, 'Unknown') AS run_requested_source, \
        a.run_requested_date, a.start_execution_date, a.stop_execution_date, b.message \
     FROM ( \
        SELECT TOP 1 run_requested_source, run_requested_date, \
               start_execution_date, stop_execution_date, job_history_id \
        FROM msdb.dbo.sysjobactivity WHERE job_id = '?' \
        ORDER BY run_requested_date DESC \
     ) AS a \
     LEFT JOIN msdb.dbo.sysjobhistory AS b ON a.job_history_id = b.instance_id \
     LEFT JOIN ( \
        VALUES (1, 'Scheduler'), (2, 'Alerter'), (3, 'Boot'), (4, 'User'), (6, 'Idle Schedule') \
     ) AS c (run_requested_source, friendly_name) \
        ON a.run_requested_source = c.run_requested_source";

const START_JOB: &str = "EXEC msdb.dbo.sp_start_job @job_id = '?'";

const STOP_JOB: &str = "EXEC msdb.dbo.sp_stop_job @job_id = '?'";

/// Escape a value for splicing into a single-quoted SQL literal by doubling
/// embedded quotes.
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

fn splice(template: &str, value: &str) -> String {
    template.replace('?', &escape_literal(value))
}

fn require_tsql(backend: &SqlBackend) -> SqlResult<()> {
    match backend.get_status().dialect.as_deref() {
        Some("mssql") => Ok(()),
        Some(other) => Err(SqlError::Dialect(format!(
            "Job queries are not available for dialect '{other}'"
        ))),
        None => Err(SqlError::Disconnected),
    }
}

/// List agent jobs with status columns.
pub async fn list_jobs(backend: &mut SqlBackend) -> SqlResult<Vec<SqlJob>> {
    require_tsql(backend)?;
    let query = backend.make_query(LIST_JOBS);
    let rows = backend.fetch_results_for(&query).await?;

    Ok(rows
        .iter()
        .map(|row| SqlJob {
            job_id: text_at(row, 0),
            name: text_at(row, 1),
            description: text_at(row, 2),
            category: text_at(row, 3),
            enabled: bool_at(row, 4),
            running: bool_at(row, 5),
            step_count: int_at(row, 6),
        })
        .collect())
}

/// Resolve a job name to its agent id.
pub async fn job_id_for_name(backend: &mut SqlBackend, name: &str) -> SqlResult<Option<String>> {
    require_tsql(backend)?;
    let query = backend.make_query(&splice(JOB_ID_FOR_NAME, name));
    let rows = backend.fetch_results_for(&query).await?;
    Ok(rows.first().map(|row| text_at(row, 0)))
}

/// Steps of one job, in execution order.
pub async fn job_steps(backend: &mut SqlBackend, job_id: &str) -> SqlResult<Vec<SqlJobStep>> {
    require_tsql(backend)?;
    let query = backend.make_query(&splice(JOB_STEPS, job_id));
    let rows = backend.fetch_results_for(&query).await?;

    Ok(rows
        .iter()
        .map(|row| SqlJobStep {
            name: text_at(row, 0),
            subsystem: text_at(row, 1),
            database: text_at(row, 2),
        })
        .collect())
}

/// The most recent run of one job, if it has ever run.
pub async fn job_last_run(backend: &mut SqlBackend, job_id: &str) -> SqlResult<Option<SqlJobRun>> {
    require_tsql(backend)?;
    let query = backend.make_query(&splice(JOB_LAST_RUN, job_id));
    let rows = backend.fetch_results_for(&query).await?;

    Ok(rows.first().map(job_run_from_row))
}

fn job_run_from_row(row: &Row) -> SqlJobRun {
    SqlJobRun {
        source: text_at(row, 0),
        requested: opt_text_at(row, 1),
        started: opt_text_at(row, 2),
        stopped: opt_text_at(row, 3),
        message: opt_text_at(row, 4),
    }
}

pub async fn start_job(backend: &mut SqlBackend, job_id: &str) -> SqlResult<()> {
    require_tsql(backend)?;
    let query = backend.make_query(&splice(START_JOB, job_id));
    backend.fetch_results_for(&query).await?;
    Ok(())
}

pub async fn stop_job(backend: &mut SqlBackend, job_id: &str) -> SqlResult<()> {
    require_tsql(backend)?;
    let query = backend.make_query(&splice(STOP_JOB, job_id));
    backend.fetch_results_for(&query).await?;
    Ok(())
}

fn text_at(row: &Row, idx: usize) -> String {
    match row.values.get(idx) {
        Some(cell) if !cell.is_null() => cell.display_string(),
        _ => String::new(),
    }
}

fn opt_text_at(row: &Row, idx: usize) -> Option<String> {
    match row.values.get(idx) {
        Some(cell) if !cell.is_null() => Some(cell.display_string()),
        _ => None,
    }
}

fn bool_at(row: &Row, idx: usize) -> bool {
    match row.values.get(idx) {
        Some(CellValue::Boolean(v)) => *v,
        Some(CellValue::Integer(v)) => *v != 0,
        Some(CellValue::Text(v)) => v == "1" || v.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn int_at(row: &Row, idx: usize) -> i64 {
    match row.values.get(idx) {
        Some(CellValue::Integer(v)) => *v,
        Some(CellValue::Text(v)) => v.parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_doubles_quotes() {
        assert_eq!(escape_literal("it's"), "it''s");
        assert_eq!(escape_literal("no quotes"), "no quotes");
        assert_eq!(escape_literal("''"), "''''");
    }

    #[test]
    fn test_splice_escapes_before_substitution() {
        let sql = splice(JOB_ID_FOR_NAME, "O'Brien's Job");
        assert!(sql.contains("= 'O''Brien''s Job'"));
        assert!(!sql.contains('?'));
    }

    #[test]
    fn test_last_run_row_mapping() {
        let finished = Row::new(vec![
            CellValue::Text("Scheduler".into()),
            CellValue::Text("2024-03-01 02:00:00".into()),
            CellValue::Text("2024-03-01 02:00:01".into()),
            CellValue::Text("2024-03-01 02:04:10".into()),
            CellValue::Text("The job succeeded.".into()),
        ]);
        let run = job_run_from_row(&finished);
        assert_eq!(run.source, "Scheduler");
        assert_eq!(run.stopped.as_deref(), Some("2024-03-01 02:04:10"));
        assert_eq!(run.message.as_deref(), Some("The job succeeded."));

        // a run still executing has no stop date and no history message yet
        let executing = Row::new(vec![
            CellValue::Text("User".into()),
            CellValue::Text("2024-03-01 02:00:00".into()),
            CellValue::Text("2024-03-01 02:00:01".into()),
            CellValue::Null,
            CellValue::Null,
        ]);
        let run = job_run_from_row(&executing);
        assert!(run.stopped.is_none());
        assert!(run.message.is_none());
    }

    #[test]
    fn test_last_run_query_splices_job_id() {
        let sql = splice(JOB_LAST_RUN, "A5F2");
        assert!(sql.contains("job_id = 'A5F2'"));
        assert!(!sql.contains('?'));
    }

    #[test]
    fn test_bool_cell_variants() {
        let row = Row::new(vec![
            CellValue::Boolean(true),
            CellValue::Integer(1),
            CellValue::Text("1".into()),
            CellValue::Integer(0),
            CellValue::Null,
        ]);
        assert!(bool_at(&row, 0));
        assert!(bool_at(&row, 1));
        assert!(bool_at(&row, 2));
        assert!(!bool_at(&row, 3));
        assert!(!bool_at(&row, 4));
    }
}
