//! Progress bar utilities for CLI operations
//!
//! Bars draw to stderr and hide themselves when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use rowdump_export::JobStatus;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Create a progress bar for byte downloads
pub fn create_download_progress(size: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Create a page counter bar
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} pages ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Mirror job status changes on `pb` until the job reaches a terminal state
/// or `done` is cancelled
pub async fn follow_job(mut status: watch::Receiver<JobStatus>, pb: ProgressBar, done: CancellationToken) {
    loop {
        let current = status.borrow_and_update().clone();
        render_status(&pb, &current);
        if current.is_terminal() {
            break;
        }
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            },
            _ = done.cancelled() => break,
        }
    }
    pb.finish_and_clear();
}

fn render_status(pb: &ProgressBar, status: &JobStatus) {
    match status {
        JobStatus::Planning => pb.set_message("Planning pages..."),
        JobStatus::Fetching { completed, total } => {
            pb.set_length(*total as u64);
            pb.set_position(*completed as u64);
            pb.set_message("Fetching pages");
        },
        JobStatus::Encoding => pb.set_message("Encoding CSV..."),
        JobStatus::Delivering => pb.set_message("Writing export..."),
        JobStatus::Idle | JobStatus::Completed | JobStatus::Failed { .. } => {},
    }
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1099511627776), "1.00 TB");
    }

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(5, "Fetching pages");
        assert_eq!(pb.length(), Some(5));
    }

    #[test]
    fn test_render_fetching_status() {
        let pb = create_progress_bar(0, "Planning");
        render_status(&pb, &JobStatus::Fetching { completed: 2, total: 5 });
        assert_eq!(pb.length(), Some(5));
        assert_eq!(pb.position(), 2);
    }

    #[tokio::test]
    async fn test_follow_job_stops_at_terminal_state() {
        let (tx, rx) = watch::channel(JobStatus::Idle);
        let pb = ProgressBar::hidden();
        let follower = tokio::spawn(follow_job(rx, pb.clone(), CancellationToken::new()));

        tx.send_replace(JobStatus::Fetching { completed: 1, total: 2 });
        tx.send_replace(JobStatus::Completed);

        follower.await.unwrap();
        assert!(pb.is_finished());
        drop(tx);
    }

    #[tokio::test]
    async fn test_follow_job_stops_when_run_returns_early() {
        let (tx, rx) = watch::channel(JobStatus::Idle);
        let pb = ProgressBar::hidden();
        let done = CancellationToken::new();
        let follower = tokio::spawn(follow_job(rx, pb.clone(), done.clone()));

        // status never leaves Idle, as with a run rejected before it starts
        done.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), follower)
            .await
            .unwrap()
            .unwrap();
        assert!(pb.is_finished());
        drop(tx);
    }
}
