use std::fs;

use anyhow::Result;
use backwatch_config::{ConfigError, SettingsStore, ShrinkFlag, ShrinkOptions, ShrinkSettings};
use tempfile::tempdir;

#[test]
fn missing_document_yields_defaults() -> Result<()> {
    let dir = tempdir()?;
    let store = SettingsStore::new(dir.path().join("settings.json"));
    let settings = store.load()?;
    assert_eq!(settings, ShrinkSettings::default());
    assert_eq!(settings.delete_hours, 168);
    Ok(())
}

#[test]
fn save_then_load_preserves_flag_order() -> Result<()> {
    let dir = tempdir()?;
    let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));
    let settings = ShrinkSettings {
        options: ShrinkOptions::from_flags([ShrinkFlag::Compress, ShrinkFlag::AutoYes]),
        logging_enabled: true,
        advanced_logging: false,
        delete_backups: true,
        delete_hours: 72,
    };
    store.save(&settings)?;

    let loaded = store.load()?;
    assert_eq!(loaded, settings);
    assert_eq!(loaded.options.tokens().collect::<Vec<_>>(), vec!["-z", "-a"]);
    assert!(!dir.path().join("nested").join("settings.json.tmp").exists());
    Ok(())
}

#[test]
fn document_uses_legacy_field_names() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{"options":["-a","-r"],"logging_enabled":true,"advanced_logging":true,"delete_backups":false,"delete_hours":24}"#,
    )?;
    let settings = SettingsStore::new(&path).load()?;
    assert!(settings.options.is_enabled(ShrinkFlag::RemoveLogs));
    assert!(settings.advanced_logging);
    assert_eq!(settings.delete_hours, 24);
    Ok(())
}

#[test]
fn malformed_document_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("settings.json");
    fs::write(&path, "{not json")?;
    let err = SettingsStore::new(&path).load().expect_err("parse failure");
    assert!(matches!(err, ConfigError::Json { .. }));
    Ok(())
}
