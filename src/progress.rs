//! Progress bar and spinner helpers.
//!
//! A spinner covers the directory scan and a bar covers file processing. In
//! log-only mode both are hidden and [`log_progress`] emits periodic
//! `[phase] n/total (pct%)` lines instead, so output stays tail-friendly.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// `850ms`, `12.4s`, `3m 05s`
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = d.as_secs();
        format!("{}m {:02}s", whole / 60, whole % 60)
    }
}

/// Bar for the per-file phase; the message shows the file being processed.
pub fn create_progress_bar(len: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta}) {wide_msg}")
                .expect("static progress template")
                .progress_chars("=> "),
        );
    }
    pb.set_prefix(phase.to_string());
    pb
}

/// Spinner for the directory scan.
pub fn create_spinner(root: &Path) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .expect("static spinner template"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(format!("Scanning {}", root.display()));
    pb
}

/// How often log-only mode reports: roughly every 5% of the run.
pub fn report_interval(total: u64) -> u64 {
    (total / 20).max(1)
}

fn progress_line(phase: &str, current: u64, total: u64) -> String {
    let pct = if total == 0 {
        100.0
    } else {
        100.0 * current as f64 / total as f64
    };
    format!("[{}] {}/{} ({:.1}%)", phase, current, total, pct)
}

/// Log progress at `interval` steps and on the last item; no-op unless log-only.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && (current % interval == 0 || current == total) {
        info!("{}", progress_line(phase, current, total));
    }
}
