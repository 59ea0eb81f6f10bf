use std::time::Duration;

use anyhow::Result;
use backwatch_events::{Event, EventBus};
use backwatch_fsops::{SettleConfig, SettleDetector, SettleOutcome};
use backwatch_telemetry::Metrics;
use backwatch_test_support::events::collect_for;
use backwatch_test_support::fixtures::{BackupTree, now, write_image, write_marker};

fn fast_config() -> SettleConfig {
    SettleConfig {
        marker: "raspiBackup.log".into(),
        image_extension: "img".into(),
        poll_interval: Duration::from_millis(20),
        settle_delay: Duration::from_millis(10),
        max_wait: Some(Duration::from_secs(5)),
        quiescence: None,
    }
}

#[tokio::test]
async fn one_notification_per_image() -> Result<()> {
    let tree = BackupTree::new()?;
    let folder = tree.backup_at(now())?;
    for name in ["a.img", "b.img", "c.img"] {
        write_image(&folder, name)?;
    }
    write_marker(&folder)?;

    let events = EventBus::new();
    let mut stream = events.subscribe();
    let detector = SettleDetector::new(fast_config(), events.clone(), Metrics::new()?);
    let outcome = detector.monitor(&folder).await;
    assert!(matches!(outcome, SettleOutcome::Images(ref images) if images.len() == 3));

    let seen = collect_for(&mut stream, Duration::from_millis(100)).await;
    let discovered: Vec<_> = seen
        .iter()
        .filter_map(|event| match event {
            Event::ImageDiscovered { image, .. } => Some(image.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        discovered,
        vec![folder.join("a.img"), folder.join("b.img"), folder.join("c.img")]
    );
    Ok(())
}

#[tokio::test]
async fn marker_without_images_emits_warning_only() -> Result<()> {
    let tree = BackupTree::new()?;
    let folder = tree.backup_at(now())?;
    write_marker(&folder)?;

    let events = EventBus::new();
    let mut stream = events.subscribe();
    let detector = SettleDetector::new(fast_config(), events.clone(), Metrics::new()?);
    assert_eq!(detector.monitor(&folder).await, SettleOutcome::Empty);

    let seen = collect_for(&mut stream, Duration::from_millis(100)).await;
    assert!(
        !seen
            .iter()
            .any(|event| matches!(event, Event::ImageDiscovered { .. }))
    );
    assert!(
        seen.iter()
            .any(|event| matches!(event, Event::NoImagesFound { folder: f } if *f == folder))
    );
    Ok(())
}

#[tokio::test]
async fn waits_for_marker_written_later() -> Result<()> {
    let tree = BackupTree::new()?;
    let folder = tree.backup_at(now())?;
    write_image(&folder, "disk.img")?;

    let detector = SettleDetector::new(fast_config(), EventBus::new(), Metrics::new()?);
    let late = folder.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        write_marker(&late)
    });
    let outcome = detector.monitor(&folder).await;
    writer.await??;
    assert_eq!(outcome, SettleOutcome::Images(vec![folder.join("disk.img")]));
    Ok(())
}
