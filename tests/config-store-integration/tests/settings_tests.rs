//! 设置加载到调度生效

mod common;

use chrono::{TimeZone, Utc};
use common::init_test_logger;
use config_store_abstractions::{ConfigStoreEvent, ConfigStoreEventKind, ScanType};
use config_store_impl::{
    ConfigStoreEventHandler, ConfigStoreSettings, RecordingConfigStoreEventListener,
    RuntimeClock, SimpleScanRequester,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_settings_file_configures_polling() -> anyhow::Result<()> {
    init_test_logger();
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        r#"{{
            "root_prefix": "policies/",
            "dynamic_updates": {{
                "enabled": true,
                "polling_interval": "PT6H",
                "time_of_day_utc": "03:00"
            }}
        }}"#
    )?;

    let settings = ConfigStoreSettings::load_from(file.path())?;
    assert!(settings.dynamic_updates.enabled);
    let configuration = settings.dynamic_updates.to_polling_configuration()?;
    assert_eq!(configuration.interval(), Duration::from_secs(6 * 3600));

    let events = Arc::new(ConfigStoreEventHandler::new());
    let recorder = Arc::new(RecordingConfigStoreEventListener::new("recorder"));
    events.register_listener(recorder.clone());
    let mut requests = SimpleScanRequester::new(Some(configuration), events)
        .with_clock(Arc::new(RuntimeClock::starting_at(
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap(),
        )))
        .start();

    // 锚定 03:00，每 6 小时一次，10:30 之后是 15:00
    let request = requests.next().await.expect("scheduled request");
    assert_eq!(request.scan_type(), ScanType::Poll);
    assert_eq!(
        request.start_scheduled(),
        Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
    );
    assert_eq!(recorder.count(ConfigStoreEventKind::PollingConfigurationApplied), 1);
    assert!(matches!(
        recorder.events().first(),
        Some(ConfigStoreEvent::PollingConfigurationApplied(_))
    ));
    requests.shutdown();
    Ok(())
}

#[test]
fn test_missing_settings_file_uses_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = ConfigStoreSettings::load_from(dir.path().join("absent.toml"))?;
    assert_eq!(settings.root_prefix, "");
    assert!(!settings.dynamic_updates.enabled);
    assert_eq!(settings.dynamic_updates.polling_interval, "PT24H");
    Ok(())
}

#[test]
fn test_invalid_interval_in_settings_is_rejected() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "[dynamic_updates]\npolling_interval = \"soon\"")?;
    let settings = ConfigStoreSettings::load_from(file.path())?;
    assert!(settings.dynamic_updates.to_polling_configuration().is_err());
    Ok(())
}
