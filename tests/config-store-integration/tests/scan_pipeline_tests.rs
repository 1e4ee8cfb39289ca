//! 外部轮询配置 → 调度器 → 扫描执行器 → 实体加载的完整流程

mod common;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common::{init_test_logger, seeded_store, ROOT};
use config_store_abstractions::{
    ConfigStoreEvent, ConfigStoreEventKind, PollingConfiguration, ScanHandler, ScanRequest,
    ScanState, ScanType,
};
use config_store_common::ConfigStoreResult;
use config_store_impl::{
    ConfigStoreEventHandler, EntityLoader, ExternalPollingConfigurationSource,
    RecordingConfigStoreEventListener, RuntimeClock, ScanExecutor, SimpleScanRequester,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLLING_PROPERTIES: &str = "policies/polling.properties";

/// 每次扫描都重新加载全部实体
struct LoadingScanHandler {
    loader: EntityLoader,
    scans: AtomicUsize,
    entities: AtomicUsize,
}

#[async_trait]
impl ScanHandler for LoadingScanHandler {
    async fn scan(&self, _request: &ScanRequest) -> ConfigStoreResult<()> {
        let report = self.loader.load_all().await?;
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.entities.store(report.entities.len(), Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "loading"
    }
}

fn scan_types(recorder: &RecordingConfigStoreEventListener) -> Vec<ScanType> {
    recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ConfigStoreEvent::ScanCompleted(completed) => Some(completed.request.scan_type()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_external_configuration_drives_scans() {
    init_test_logger();
    let store = seeded_store();
    store
        .put(
            POLLING_PROPERTIES,
            "csc.dynamic-updates.polling-interval=PT1H\ncsc.dynamic-updates.time-of-day-utc=00:00",
        )
        .unwrap();

    let events = Arc::new(ConfigStoreEventHandler::new());
    let recorder = Arc::new(RecordingConfigStoreEventListener::new("recorder"));
    events.register_listener(recorder.clone());
    let clock = Arc::new(RuntimeClock::starting_at(
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap(),
    ));

    let base = PollingConfiguration::new(Duration::from_secs(86_400))
        .with_external_polling_properties_object_key(POLLING_PROPERTIES);
    let (updates, source_task) =
        ExternalPollingConfigurationSource::new(store.clone(), base.clone(), events.clone())
            .spawn(Duration::from_secs(300));

    let requests = SimpleScanRequester::new(Some(base), events.clone())
        .with_clock(clock.clone())
        .start_with_updates(updates);
    requests.request_load().await.unwrap();

    let handler = Arc::new(LoadingScanHandler {
        loader: EntityLoader::new(store.clone(), ROOT),
        scans: AtomicUsize::new(0),
        entities: AtomicUsize::new(0),
    });
    let executor = Arc::new(ScanExecutor::new(handler.clone(), events.clone()).with_clock(clock));
    let scan_task = executor.clone().run(requests);

    // 10:30 → 12:30，一次加载加上 11:00 和 12:00 两次轮询
    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
    assert_eq!(handler.scans.load(Ordering::SeqCst), 3);
    assert_eq!(handler.entities.load(Ordering::SeqCst), 3);
    assert_eq!(
        scan_types(&recorder),
        vec![ScanType::Load, ScanType::Poll, ScanType::Poll]
    );
    assert_eq!(executor.state(), ScanState::Completed);
    let last = executor.last_completed().unwrap();
    assert_eq!(
        last.request.start_scheduled(),
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    );
    assert!(recorder.count(ConfigStoreEventKind::PollingConfigurationApplied) >= 1);
    assert_eq!(recorder.count(ConfigStoreEventKind::PollingConfigurationErrorOccurred), 0);

    // 非法间隔被拒绝，原有的每小时调度继续
    store
        .put(
            POLLING_PROPERTIES,
            "csc.dynamic-updates.polling-interval=PT7M\ncsc.dynamic-updates.time-of-day-utc=00:00",
        )
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(recorder.count(ConfigStoreEventKind::PollingConfigurationErrorOccurred), 1);
    assert_eq!(handler.scans.load(Ordering::SeqCst), 4);

    source_task.abort();
    scan_task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_failing_store_is_reported_without_completion() {
    init_test_logger();
    let store = seeded_store();
    let events = Arc::new(ConfigStoreEventHandler::new());
    let recorder = Arc::new(RecordingConfigStoreEventListener::new("recorder"));
    events.register_listener(recorder.clone());

    let handler = Arc::new(LoadingScanHandler {
        loader: EntityLoader::new(store.clone(), ROOT),
        scans: AtomicUsize::new(0),
        entities: AtomicUsize::new(0),
    });
    let executor = ScanExecutor::new(handler.clone(), events);

    store.set_available(false);
    let failed = executor
        .execute(ScanRequest::new(Utc::now(), ScanType::Load))
        .await;
    assert!(failed.is_err());
    assert_eq!(executor.state(), ScanState::Failed);

    store.set_available(true);
    let completed = executor
        .execute(ScanRequest::new(Utc::now(), ScanType::Load))
        .await
        .unwrap();
    assert_eq!(completed.request.scan_type(), ScanType::Load);
    assert_eq!(executor.state(), ScanState::Completed);
    assert_eq!(recorder.count(ConfigStoreEventKind::ScanCompleted), 1);
    assert_eq!(handler.entities.load(Ordering::SeqCst), 3);
}
