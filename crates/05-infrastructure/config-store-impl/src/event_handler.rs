//! 配置存储事件处理器实现

use config_store_abstractions::{
    ConfigStoreEvent, ConfigStoreEventKind, ConfigStoreEventListener, ConfigStoreEventPublisher,
};
use config_store_common::{ConfigStoreError, ConfigStoreResult};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

const BROADCAST_CAPACITY: usize = 1000;

/// 配置存储事件处理器
///
/// 负责把事件同步分发到各个监听器，同时通过广播通道推送给订阅者
pub struct ConfigStoreEventHandler {
    /// 事件监听器映射
    listeners: RwLock<HashMap<String, Arc<dyn ConfigStoreEventListener>>>,
    /// 事件广播通道
    event_sender: broadcast::Sender<ConfigStoreEvent>,
}

impl ConfigStoreEventHandler {
    /// 创建新的事件处理器
    pub fn new() -> Self {
        let (event_sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            listeners: RwLock::new(HashMap::new()),
            event_sender,
        }
    }

    /// 注册事件监听器，同名监听器被替换
    pub fn register_listener(&self, listener: Arc<dyn ConfigStoreEventListener>) {
        info!("注册配置存储事件监听器: {}", listener.name());
        self.listeners
            .write()
            .insert(listener.name().to_string(), listener);
    }

    /// 移除事件监听器
    pub fn unregister_listener(&self, listener_name: &str) -> ConfigStoreResult<()> {
        info!("移除配置存储事件监听器: {}", listener_name);
        if self.listeners.write().remove(listener_name).is_some() {
            Ok(())
        } else {
            Err(ConfigStoreError::ListenerNotFound {
                name: listener_name.to_string(),
            })
        }
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigStoreEvent> {
        self.event_sender.subscribe()
    }

    /// 分发事件到监听器
    fn dispatch_event(&self, event: &ConfigStoreEvent) {
        let kind = event.kind();
        let listeners: Vec<Arc<dyn ConfigStoreEventListener>> =
            self.listeners.read().values().cloned().collect();

        for listener in listeners {
            if !listener.is_enabled() {
                continue;
            }

            let interested_kinds = listener.interested_event_kinds();
            if !interested_kinds.is_empty() && !interested_kinds.contains(&kind) {
                continue;
            }

            debug!("向监听器 {} 分发事件: {:?}", listener.name(), kind);
            listener.on_event(event);
        }
    }

    /// 获取监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 获取所有监听器名称
    pub fn listener_names(&self) -> Vec<String> {
        self.listeners.read().keys().cloned().collect()
    }
}

impl Default for ConfigStoreEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStoreEventPublisher for ConfigStoreEventHandler {
    fn publish(&self, event: ConfigStoreEvent) {
        self.dispatch_event(&event);
        // 没有订阅者时发送失败，忽略即可
        let _ = self.event_sender.send(event);
    }
}

/// 日志记录事件监听器
///
/// 将所有配置存储事件记录到日志中
pub struct LoggingConfigStoreEventListener {
    name: String,
    enabled: bool,
}

impl LoggingConfigStoreEventListener {
    /// 创建新的日志记录监听器
    pub fn new() -> Self {
        Self {
            name: "LoggingConfigStoreEventListener".to_string(),
            enabled: true,
        }
    }

    /// 设置是否启用
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Default for LoggingConfigStoreEventListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStoreEventListener for LoggingConfigStoreEventListener {
    fn on_event(&self, event: &ConfigStoreEvent) {
        match event {
            ConfigStoreEvent::ScanCompleted(completed) => {
                info!(
                    "扫描完成: type={}, 耗时 {}ms, 调度延迟 {}ms",
                    completed.request.scan_type(),
                    completed.duration_millis(),
                    completed.scheduling_lag_millis()
                );
            }
            ConfigStoreEvent::PollingConfigurationApplied(applied) => {
                info!("轮询配置已生效: {}", applied.configuration);
            }
            ConfigStoreEvent::PollingConfigurationErrorOccurred(occurred) => {
                error!(
                    "轮询配置应用失败: {}, 原因: {}",
                    occurred.configuration, occurred.error
                );
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// 记录事件的监听器
///
/// 保存事件历史并按类型计数
pub struct RecordingConfigStoreEventListener {
    name: String,
    interested_kinds: Vec<ConfigStoreEventKind>,
    counts: DashMap<ConfigStoreEventKind, u64>,
    history: Mutex<Vec<ConfigStoreEvent>>,
}

impl RecordingConfigStoreEventListener {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interested_kinds: ConfigStoreEventKind::all(),
            counts: DashMap::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// 只记录指定类型的事件
    pub fn with_interested_kinds(mut self, kinds: Vec<ConfigStoreEventKind>) -> Self {
        self.interested_kinds = kinds;
        self
    }

    /// 某类事件的数量
    pub fn count(&self, kind: ConfigStoreEventKind) -> u64 {
        self.counts.get(&kind).map(|count| *count).unwrap_or(0)
    }

    /// 事件历史
    pub fn events(&self) -> Vec<ConfigStoreEvent> {
        self.history.lock().clone()
    }

    /// 最近一个事件
    pub fn last_event(&self) -> Option<ConfigStoreEvent> {
        self.history.lock().last().cloned()
    }

    /// 清空记录
    pub fn reset(&self) {
        self.counts.clear();
        self.history.lock().clear();
    }
}

impl ConfigStoreEventListener for RecordingConfigStoreEventListener {
    fn on_event(&self, event: &ConfigStoreEvent) {
        *self.counts.entry(event.kind()).or_insert(0) += 1;
        self.history.lock().push(event.clone());
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn interested_event_kinds(&self) -> Vec<ConfigStoreEventKind> {
        self.interested_kinds.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use config_store_abstractions::{
        ConfigStoreScanCompleted, PollingConfiguration, PollingConfigurationApplied, ScanRequest,
        ScanType,
    };
    use std::time::Duration;

    fn scan_completed() -> ConfigStoreEvent {
        let request = ScanRequest::new(Utc::now(), ScanType::Load);
        ConfigStoreScanCompleted::new(request, Utc::now()).into()
    }

    fn applied() -> ConfigStoreEvent {
        PollingConfigurationApplied {
            configuration: PollingConfiguration::new(Duration::from_secs(60)),
        }
        .into()
    }

    #[test]
    fn test_event_handler_creation() {
        let handler = ConfigStoreEventHandler::new();
        assert_eq!(handler.listener_count(), 0);
    }

    #[test]
    fn test_register_and_unregister_listener() {
        let handler = ConfigStoreEventHandler::new();
        let listener = Arc::new(LoggingConfigStoreEventListener::new());
        let listener_name = listener.name().to_string();

        handler.register_listener(listener);
        assert_eq!(handler.listener_names(), vec![listener_name.clone()]);

        assert!(handler.unregister_listener(&listener_name).is_ok());
        assert_eq!(handler.listener_count(), 0);
        assert!(matches!(
            handler.unregister_listener(&listener_name),
            Err(ConfigStoreError::ListenerNotFound { name }) if name == listener_name
        ));
    }

    #[test]
    fn test_unregister_unknown_listener_names_listener() {
        let handler = ConfigStoreEventHandler::new();
        let err = handler.unregister_listener("missing-listener").unwrap_err();
        assert!(!matches!(err, ConfigStoreError::ConfigManagement { .. }));
        assert_eq!(err.to_string(), "事件监听器不存在: missing-listener");
    }

    #[test]
    fn test_dispatch_filters_by_kind() {
        let handler = ConfigStoreEventHandler::new();
        let all = Arc::new(RecordingConfigStoreEventListener::new("all"));
        let scans = Arc::new(
            RecordingConfigStoreEventListener::new("scans")
                .with_interested_kinds(vec![ConfigStoreEventKind::ScanCompleted]),
        );
        handler.register_listener(all.clone());
        handler.register_listener(scans.clone());

        handler.publish(scan_completed());
        handler.publish(applied());

        assert_eq!(all.events().len(), 2);
        assert_eq!(scans.events().len(), 1);
        assert_eq!(scans.count(ConfigStoreEventKind::ScanCompleted), 1);
        assert_eq!(scans.count(ConfigStoreEventKind::PollingConfigurationApplied), 0);
        assert!(matches!(
            all.last_event(),
            Some(ConfigStoreEvent::PollingConfigurationApplied(_))
        ));

        all.reset();
        assert!(all.events().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let handler = ConfigStoreEventHandler::new();
        let mut receiver = handler.subscribe();

        handler.publish(applied());
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind(), ConfigStoreEventKind::PollingConfigurationApplied);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let handler = ConfigStoreEventHandler::new();
        handler.register_listener(Arc::new(LoggingConfigStoreEventListener::new()));
        handler.publish(scan_completed());
    }
}
