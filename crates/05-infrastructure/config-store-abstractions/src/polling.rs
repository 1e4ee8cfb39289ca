//! 轮询配置定义

use chrono::{DateTime, NaiveTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;

/// 默认锚定时间 02:00 UTC
pub fn default_time_of_day_utc() -> NaiveTime {
    NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// 轮询配置
///
/// 首次轮询对齐到 `time_of_day_utc`，之后每隔 `interval` 触发一次。
#[derive(Debug, Clone)]
pub struct PollingConfiguration {
    interval: Duration,
    time_of_day_utc: NaiveTime,
    external_polling_properties_object_key: Option<String>,
    scheduler: Option<Handle>,
}

impl PollingConfiguration {
    /// 使用默认锚定时间创建
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            time_of_day_utc: default_time_of_day_utc(),
            external_polling_properties_object_key: None,
            scheduler: None,
        }
    }

    /// 设置锚定时间
    pub fn with_time_of_day_utc(mut self, time_of_day_utc: NaiveTime) -> Self {
        self.time_of_day_utc = time_of_day_utc;
        self
    }

    /// 设置外部轮询属性对象键
    pub fn with_external_polling_properties_object_key(mut self, key: impl Into<String>) -> Self {
        self.external_polling_properties_object_key = Some(key.into());
        self
    }

    /// 设置执行调度的运行时
    pub fn with_scheduler(mut self, scheduler: Handle) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn time_of_day_utc(&self) -> NaiveTime {
        self.time_of_day_utc
    }

    pub fn external_polling_properties_object_key(&self) -> Option<&str> {
        self.external_polling_properties_object_key.as_deref()
    }

    pub fn scheduler(&self) -> Option<&Handle> {
        self.scheduler.as_ref()
    }
}

/// 调度运行时不参与比较
impl PartialEq for PollingConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.interval == other.interval
            && self.time_of_day_utc == other.time_of_day_utc
            && self.external_polling_properties_object_key
                == other.external_polling_properties_object_key
    }
}

impl Eq for PollingConfiguration {}

impl fmt::Display for PollingConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PollingConfiguration(interval={}ms, timeOfDayUTC={}",
            self.interval.as_millis(),
            self.time_of_day_utc
        )?;
        if let Some(key) = &self.external_polling_properties_object_key {
            write!(f, ", externalPollingPropertiesObjectKey={key}")?;
        }
        f.write_str(")")
    }
}

/// 时钟 trait
pub trait Clock: Send + Sync {
    /// 当前 UTC 时间
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
