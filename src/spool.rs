//! The spool monitor.
//!
//! A background task that watches the row counter of an in-flight spool and
//! re-renders a single progress line (spinner, elapsed time, row count) every
//! 100 ms until stopped, painting one last frame with the final count (and
//! the done glyph when the spool completed) before the line is cleared. The
//! monitor is purely cosmetic: it never fails, and
//! callers must await [`SpoolMonitor::stop`] before printing anything else so
//! the progress line cannot corrupt subsequent output.

use crate::prompt::Prompt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Spinner glyphs cycled on each poll tick.
pub const PROGRESS_GLYPHS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Glyph appended to the final render once the spool is marked done.
pub const DONE_GLYPH: char = '✓';

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a running progress reporter.
///
/// The fetch loop is the sole writer of the row counter; the monitor only
/// reads it. `stop` cancels the task and joins it, guaranteeing the progress
/// line has been cleared (and the cursor restored) before `stop` returns.
pub struct SpoolMonitor {
    handle: JoinHandle<()>,
    stopped: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
}

impl SpoolMonitor {
    /// Spawn the monitor over a shared row counter.
    pub fn start(prompt: Arc<dyn Prompt>, rows: Arc<AtomicUsize>) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));

        let task_stopped = Arc::clone(&stopped);
        let task_done = Arc::clone(&done);
        let handle = tokio::spawn(async move {
            prompt.hide_cursor();
            let start = Instant::now();
            let mut glyph_offset = 0usize;

            // render-then-check, so the frame painted after the stop flag is
            // raised reflects the final row count and done glyph
            loop {
                let row_count = rows.load(Ordering::Acquire);
                let plural = if row_count == 1 { "" } else { "s" };
                let check = if task_done.load(Ordering::Acquire) {
                    format!(" {DONE_GLYPH}")
                } else {
                    String::new()
                };
                prompt.display_progress(
                    PROGRESS_GLYPHS[glyph_offset],
                    &format!(
                        "{}    {} row{}{}",
                        human_readable_duration(start.elapsed().as_secs_f64()),
                        row_count,
                        plural,
                        check
                    ),
                );
                if task_stopped.load(Ordering::Acquire) {
                    break;
                }
                glyph_offset = (glyph_offset + 1) % PROGRESS_GLYPHS.len();
                tokio::time::sleep(POLL_INTERVAL).await;
            }

            prompt.clear_progress();
            prompt.show_cursor();
        });

        Self {
            handle,
            stopped,
            done,
        }
    }

    /// Mark the spool complete so the final render carries the done glyph.
    pub fn set_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Request termination and wait for the task to actually finish.
    pub async fn stop(self) {
        self.stopped.store(true, Ordering::Release);
        // an internal panic must never abort a successful query
        let _ = self.handle.await;
    }
}

fn human_readable_duration_hms(seconds: f64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        (seconds as u64) / 3600,
        ((seconds as u64) / 60) % 60,
        (seconds as u64) % 60
    )
}

/// Format an elapsed duration the way the progress line shows it: tenths of
/// a second under a minute, `hh:mm:ss` under a day, days plus `hh:mm:ss`
/// beyond that.
pub fn human_readable_duration(seconds: f64) -> String {
    const DAY: f64 = 60.0 * 60.0 * 24.0;

    if seconds < 60.0 {
        format!("{}s", (seconds * 10.0).floor() / 10.0)
    } else if seconds < DAY {
        human_readable_duration_hms(seconds)
    } else {
        format!(
            "{} days {}",
            (seconds / DAY) as u64,
            human_readable_duration_hms(seconds % DAY)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_duration_under_a_minute() {
        assert_eq!(human_readable_duration(0.0), "0s");
        assert_eq!(human_readable_duration(1.26), "1.2s");
        assert_eq!(human_readable_duration(59.99), "59.9s");
    }

    #[test]
    fn test_duration_hms() {
        assert_eq!(human_readable_duration(60.0), "00:01:00");
        assert_eq!(human_readable_duration(3661.0), "01:01:01");
    }

    #[test]
    fn test_duration_days() {
        assert_eq!(human_readable_duration(86400.0 + 3600.0), "1 days 01:00:00");
    }

    #[derive(Default)]
    struct RecordingPrompt {
        progress: Mutex<Vec<String>>,
        cleared: Mutex<bool>,
    }

    impl Prompt for RecordingPrompt {
        fn display_progress(&self, _glyph: char, text: &str) {
            self.progress.lock().push(text.to_string());
        }
        fn clear_progress(&self) {
            *self.cleared.lock() = true;
        }
        fn display_table(&self, _rendered: &str) {}
        fn display_message_sql(&self, _text: &str) {}
        fn display_info(&self, _text: &str) {}
        fn hide_cursor(&self) {}
        fn show_cursor(&self) {}
    }

    #[tokio::test]
    async fn test_monitor_renders_and_clears_on_stop() {
        let prompt = Arc::new(RecordingPrompt::default());
        let rows = Arc::new(AtomicUsize::new(0));

        let monitor = SpoolMonitor::start(prompt.clone(), Arc::clone(&rows));
        rows.store(3, Ordering::Release);
        tokio::time::sleep(Duration::from_millis(250)).await;
        monitor.set_done();
        tokio::time::sleep(Duration::from_millis(150)).await;
        monitor.stop().await;

        let progress = prompt.progress.lock();
        assert!(!progress.is_empty());
        assert!(progress.iter().any(|line| line.contains("3 rows")));
        assert!(progress.last().unwrap().contains('✓'));
        assert!(*prompt.cleared.lock());
    }

    #[tokio::test]
    async fn test_done_glyph_renders_without_a_poll_tick() {
        // the fetch loop marks done and stops back to back; the final frame
        // must still carry the check mark
        let prompt = Arc::new(RecordingPrompt::default());
        let rows = Arc::new(AtomicUsize::new(5));

        let monitor = SpoolMonitor::start(prompt.clone(), rows);
        monitor.set_done();
        monitor.stop().await;

        let progress = prompt.progress.lock();
        assert!(!progress.is_empty());
        assert!(progress.last().unwrap().contains('✓'));
        assert!(progress.last().unwrap().contains("5 rows"));
        assert!(*prompt.cleared.lock());
    }

    #[tokio::test]
    async fn test_singular_row_label() {
        let prompt = Arc::new(RecordingPrompt::default());
        let rows = Arc::new(AtomicUsize::new(1));

        let monitor = SpoolMonitor::start(prompt.clone(), rows);
        tokio::time::sleep(Duration::from_millis(120)).await;
        monitor.stop().await;

        let progress = prompt.progress.lock();
        assert!(progress.iter().any(|line| line.contains("1 row")));
        assert!(!progress.iter().any(|line| line.contains("1 rows")));
    }
}
