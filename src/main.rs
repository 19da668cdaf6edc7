//! omnisql - a multi-dialect SQL client for the terminal
//!
//! Thin binary shell: argument parsing, the line REPL and top-level error
//! display. All session logic lives in the library modules.

use anyhow::Result;
use clap::Parser;
use omnisql::backend::SqlBackend;
use omnisql::config::Config;
use omnisql::error::{SqlError, SqlResult};
use omnisql::jobs;
use omnisql::prompt::TerminalPrompt;
use omnisql::table::{ComfyTableRenderer, CsvRenderer, TableRenderer};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "omnisql", version, about = "Multi-dialect SQL client")]
struct Args {
    /// Connection URL or alias to connect to at startup
    target: Option<String>,

    /// Render result sets as CSV instead of boxed tables
    #[arg(long)]
    csv: bool,
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("could not load configuration: {e}");
        Config::default()
    });

    let renderer: Box<dyn TableRenderer> = if args.csv {
        Box::new(CsvRenderer::new())
    } else {
        Box::new(ComfyTableRenderer::new())
    };
    let mut backend = SqlBackend::new(Arc::new(TerminalPrompt::new()), renderer, config.aliases);

    // Ctrl-C cancels the running spool instead of killing the process
    let interrupt = backend.interrupt_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupt.store(true, Ordering::Release);
        }
    });

    if let Some(target) = &args.target {
        report(backend.connect(target).await);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    show_prompt();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if !line.is_empty() {
            if let Flow::Quit = dispatch(&mut backend, line).await {
                break;
            }
        }
        show_prompt();
    }

    backend.disconnect().await?;
    Ok(())
}

fn show_prompt() {
    print!("omnisql> ");
    let _ = std::io::stdout().flush();
}

async fn dispatch(backend: &mut SqlBackend, line: &str) -> Flow {
    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let tail = parts.next().unwrap_or("").trim();

    match head {
        "quit" | "exit" => return Flow::Quit,
        "connect" => report(backend.connect(tail).await),
        "disconnect" => report(backend.disconnect().await),
        "status" => show_status(backend),
        "refresh" => backend.invalidate_completions(),
        "jobs" => report(run_jobs(backend, tail).await),
        _ => {
            let query = backend.make_query(line);
            report(backend.execute(&query).await);
        }
    }
    Flow::Continue
}

fn show_status(backend: &SqlBackend) {
    let status = backend.get_status();
    if !status.connected {
        println!("not connected");
        return;
    }
    println!(
        "connected to {} ({})",
        status.connection_detail.unwrap_or_default(),
        status.dialect.unwrap_or_default()
    );
    if let Some(session_id) = status.session_id {
        println!("session id: {session_id}");
    }
    if backend.inspecting() {
        println!("structure discovery in progress");
    }
}

async fn run_jobs(backend: &mut SqlBackend, args: &str) -> SqlResult<()> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let sub = parts.next().unwrap_or("");
    let name = parts.next().unwrap_or("").trim();

    match sub {
        "" | "list" | "status" => {
            for job in jobs::list_jobs(backend).await? {
                let state = if job.running {
                    "running"
                } else if job.enabled {
                    "idle"
                } else {
                    "disabled"
                };
                println!(
                    "{} [{}] {} step(s)  {}",
                    job.name, state, job.step_count, job.description
                );
            }
            Ok(())
        }
        "steps" => {
            let job_id = resolve_job(backend, name).await?;
            for (i, step) in jobs::job_steps(backend, &job_id).await?.iter().enumerate() {
                println!(
                    "{}. {} ({}, database {})",
                    i + 1,
                    step.name,
                    step.subsystem,
                    step.database
                );
            }
            Ok(())
        }
        "last" => {
            let job_id = resolve_job(backend, name).await?;
            match jobs::job_last_run(backend, &job_id).await? {
                None => println!("{name} has never run"),
                Some(run) => {
                    println!("requested by: {}", run.source);
                    if let Some(requested) = run.requested {
                        println!("requested at: {requested}");
                    }
                    if let Some(started) = run.started {
                        println!("started at:   {started}");
                    }
                    match run.stopped {
                        Some(stopped) => println!("stopped at:   {stopped}"),
                        None => println!("still executing"),
                    }
                    if let Some(message) = run.message {
                        println!("message:      {message}");
                    }
                }
            }
            Ok(())
        }
        "start" => {
            let job_id = resolve_job(backend, name).await?;
            jobs::start_job(backend, &job_id).await
        }
        "stop" => {
            let job_id = resolve_job(backend, name).await?;
            jobs::stop_job(backend, &job_id).await
        }
        other => Err(SqlError::Dialect(format!(
            "Unknown jobs subcommand '{other}'"
        ))),
    }
}

async fn resolve_job(backend: &mut SqlBackend, name: &str) -> SqlResult<String> {
    if name.is_empty() {
        return Err(SqlError::Query("A job name is required".to_string()));
    }
    jobs::job_id_for_name(backend, name)
        .await?
        .ok_or_else(|| SqlError::Query(format!("No job named '{name}'")))
}

fn report<T>(result: SqlResult<T>) {
    if let Err(e) = result {
        eprintln!("{}", render_error(e));
    }
}

/// Recoverable errors print as a short `Kind: message` line. Kinds that point
/// at a programming error (a query handed to the wrong backend) render the
/// full diagnostic chain instead.
fn render_error(e: SqlError) -> String {
    if e.is_recoverable() {
        format!("{}: {e}", e.kind())
    } else {
        format!("{:?}", anyhow::Error::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors_render_short() {
        let line = render_error(SqlError::Query("syntax error".into()));
        assert_eq!(line, "Query: syntax error");
    }

    #[test]
    fn test_mismatch_renders_full_diagnostic() {
        let err = SqlError::BackendMismatch(
            "The provided query was created by a different backend".into(),
        );
        assert!(!err.is_recoverable());
        let rendered = render_error(err);
        assert!(rendered.contains("different backend"));
        assert!(!rendered.starts_with("BackendMismatch:"));
    }
}
