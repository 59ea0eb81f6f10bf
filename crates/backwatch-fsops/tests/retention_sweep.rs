use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use anyhow::Result;
use backwatch_events::{Event, EventBus};
use backwatch_fsops::{BackupNaming, RetentionSweeper};
use backwatch_telemetry::Metrics;
use backwatch_test_support::fixtures::{BackupTree, now, write_image, write_marker};

const WEEK: Duration = Duration::from_secs(168 * 3600);

fn sweeper(events: &EventBus, metrics: &Metrics) -> Result<RetentionSweeper> {
    Ok(RetentionSweeper::new(
        BackupNaming::new(Some("raspihaupt"))?,
        events.clone(),
        metrics.clone(),
    ))
}

#[test]
fn deletes_only_folders_older_than_the_cutoff() -> Result<()> {
    let tree = BackupTree::new()?;
    let reference = now();
    let ancient = tree.backup_hours_before(reference, 200)?;
    let recent = tree.backup_hours_before(reference, 100)?;
    let current = tree.backup_hours_before(reference, 1)?;
    write_image(&ancient, "disk.img")?;
    write_marker(&ancient)?;
    let unrelated = tree.plain_dir("photos")?;

    let events = EventBus::new();
    let metrics = Metrics::new()?;
    let report = sweeper(&events, &metrics)?.sweep(&current, WEEK, reference)?;

    assert_eq!(report.deleted, vec![ancient.clone()]);
    assert!(report.failed.is_empty());
    assert_eq!(report.skipped, 2);
    assert!(report.freed_bytes >= 512);
    assert!(!ancient.exists());
    assert!(recent.exists());
    assert!(current.exists());
    assert!(unrelated.exists());
    assert_eq!(metrics.snapshot().retention_deleted_total, 1);

    let completed = events
        .backlog_since(0)
        .into_iter()
        .find(|env| matches!(env.event, Event::RetentionCompleted { .. }))
        .expect("completion event");
    assert!(matches!(
        completed.event,
        Event::RetentionCompleted { failed: 0, ref deleted, .. } if deleted.len() == 1
    ));
    Ok(())
}

#[test]
fn never_deletes_the_current_folder_even_when_stale() -> Result<()> {
    let tree = BackupTree::new()?;
    let reference = now();
    let current = tree.backup_hours_before(reference, 400)?;
    let other = tree.backup_hours_before(reference, 300)?;

    let events = EventBus::new();
    let report = sweeper(&events, &Metrics::new()?)?.sweep(&current, WEEK, reference)?;

    assert_eq!(report.deleted, vec![other]);
    assert!(current.exists());
    Ok(())
}

#[test]
fn nothing_to_delete_is_a_noop() -> Result<()> {
    let tree = BackupTree::new()?;
    let reference = now();
    let current = tree.backup_hours_before(reference, 1)?;
    tree.backup_hours_before(reference, 24)?;

    let report = sweeper(&EventBus::new(), &Metrics::new()?)?.sweep(&current, WEEK, reference)?;
    assert!(report.is_noop());
    assert_eq!(report.skipped, 2);
    Ok(())
}

#[test]
fn dry_run_reports_without_deleting() -> Result<()> {
    let tree = BackupTree::new()?;
    let reference = now();
    let current = tree.backup_hours_before(reference, 1)?;
    let stale = tree.backup_hours_before(reference, 500)?;

    let events = EventBus::new();
    let report = sweeper(&events, &Metrics::new()?)?
        .dry_run(true)
        .sweep(&current, WEEK, reference)?;
    assert_eq!(report.deleted, vec![stale.clone()]);
    assert!(stale.exists());
    assert!(events.backlog_since(0).is_empty());
    Ok(())
}

#[test]
fn undeletable_folder_is_reported_and_the_sweep_continues() -> Result<()> {
    let tree = BackupTree::new()?;
    let reference = now();
    let locked = tree.backup_hours_before(reference, 300)?;
    let stale = tree.backup_hours_before(reference, 200)?;
    let current = tree.backup_hours_before(reference, 1)?;
    let inner = locked.join("inner");
    fs::create_dir(&inner)?;
    fs::write(inner.join("disk.img"), b"data")?;
    fs::set_permissions(&inner, Permissions::from_mode(0o555))?;
    if fs::write(inner.join("write-check"), b"").is_ok() {
        // Permission bits are not enforced for this user (root).
        fs::set_permissions(&inner, Permissions::from_mode(0o755))?;
        return Ok(());
    }

    let events = EventBus::new();
    let metrics = Metrics::new()?;
    let outcome = sweeper(&events, &metrics)?.sweep(&current, WEEK, reference);
    fs::set_permissions(&inner, Permissions::from_mode(0o755))?;
    let report = outcome?;

    assert_eq!(report.deleted, vec![stale.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, locked);
    assert!(locked.exists());
    assert!(!stale.exists());
    assert!(current.exists());
    assert_eq!(metrics.snapshot().retention_failures_total, 1);

    let backlog = events.backlog_since(0);
    let failures: Vec<_> = backlog
        .iter()
        .filter(|env| matches!(env.event, Event::RetentionFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0].event,
        Event::RetentionFailed { ref folder, .. } if *folder == locked
    ));
    assert!(backlog.iter().any(|env| matches!(
        env.event,
        Event::RetentionCompleted { failed: 1, ref deleted, .. } if deleted.len() == 1
    )));
    Ok(())
}

#[test]
fn folders_with_a_job_in_flight_are_kept() -> Result<()> {
    let tree = BackupTree::new()?;
    let reference = now();
    let busy = tree.backup_hours_before(reference, 300)?;
    let stale = tree.backup_hours_before(reference, 200)?;
    let current = tree.backup_hours_before(reference, 1)?;

    let sweeper = sweeper(&EventBus::new(), &Metrics::new()?)?;
    let guard = sweeper.clone().active_folders().hold(&busy);
    let report = sweeper.sweep(&current, WEEK, reference)?;
    assert_eq!(report.deleted, vec![stale]);
    assert!(busy.exists());

    drop(guard);
    let report = sweeper.sweep(&current, WEEK, reference)?;
    assert_eq!(report.deleted, vec![busy.clone()]);
    assert!(!busy.exists());
    Ok(())
}
