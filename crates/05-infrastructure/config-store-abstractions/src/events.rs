//! 扫描与轮询事件定义

use crate::polling::PollingConfiguration;
use crate::scan::ScanRequest;
use chrono::{DateTime, Utc};
use config_store_common::ConfigStoreError;

/// 扫描完成事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStoreScanCompleted {
    /// 触发本次扫描的请求
    pub request: ScanRequest,
    /// 实际结束时间
    pub end_actual: DateTime<Utc>,
}

impl ConfigStoreScanCompleted {
    /// 创建扫描完成事件
    pub fn new(request: ScanRequest, end_actual: DateTime<Utc>) -> Self {
        Self {
            request,
            end_actual,
        }
    }

    /// 扫描耗时（毫秒），从实际开始时间算起
    pub fn duration_millis(&self) -> i64 {
        (self.end_actual - self.request.start_actual()).num_milliseconds()
    }

    /// 调度延迟（毫秒）
    pub fn scheduling_lag_millis(&self) -> i64 {
        self.request.scheduling_lag_millis()
    }
}

/// 轮询配置已生效事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfigurationApplied {
    pub configuration: PollingConfiguration,
}

/// 轮询配置应用失败事件
#[derive(Debug, Clone)]
pub struct PollingConfigurationErrorOccurred {
    pub configuration: PollingConfiguration,
    pub error: ConfigStoreError,
}

/// 配置存储事件
#[derive(Debug, Clone)]
pub enum ConfigStoreEvent {
    /// 扫描完成
    ScanCompleted(ConfigStoreScanCompleted),
    /// 轮询配置生效
    PollingConfigurationApplied(PollingConfigurationApplied),
    /// 轮询配置失败
    PollingConfigurationErrorOccurred(PollingConfigurationErrorOccurred),
}

impl ConfigStoreEvent {
    /// 事件类型
    pub fn kind(&self) -> ConfigStoreEventKind {
        match self {
            Self::ScanCompleted(_) => ConfigStoreEventKind::ScanCompleted,
            Self::PollingConfigurationApplied(_) => {
                ConfigStoreEventKind::PollingConfigurationApplied
            }
            Self::PollingConfigurationErrorOccurred(_) => {
                ConfigStoreEventKind::PollingConfigurationErrorOccurred
            }
        }
    }
}

impl From<ConfigStoreScanCompleted> for ConfigStoreEvent {
    fn from(event: ConfigStoreScanCompleted) -> Self {
        Self::ScanCompleted(event)
    }
}

impl From<PollingConfigurationApplied> for ConfigStoreEvent {
    fn from(event: PollingConfigurationApplied) -> Self {
        Self::PollingConfigurationApplied(event)
    }
}

impl From<PollingConfigurationErrorOccurred> for ConfigStoreEvent {
    fn from(event: PollingConfigurationErrorOccurred) -> Self {
        Self::PollingConfigurationErrorOccurred(event)
    }
}

/// 配置存储事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigStoreEventKind {
    /// 扫描完成
    ScanCompleted,
    /// 轮询配置生效
    PollingConfigurationApplied,
    /// 轮询配置失败
    PollingConfigurationErrorOccurred,
}

impl ConfigStoreEventKind {
    /// 所有事件类型
    pub fn all() -> Vec<Self> {
        vec![
            Self::ScanCompleted,
            Self::PollingConfigurationApplied,
            Self::PollingConfigurationErrorOccurred,
        ]
    }
}

/// 配置存储事件监听器 trait
pub trait ConfigStoreEventListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &ConfigStoreEvent);

    /// 获取监听器名称
    fn name(&self) -> &str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }

    /// 获取感兴趣的事件类型
    fn interested_event_kinds(&self) -> Vec<ConfigStoreEventKind> {
        ConfigStoreEventKind::all()
    }
}

/// 配置存储事件发布者 trait
pub trait ConfigStoreEventPublisher: Send + Sync {
    /// 发布事件
    fn publish(&self, event: ConfigStoreEvent);
}
