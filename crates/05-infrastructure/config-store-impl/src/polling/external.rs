//! 外部轮询属性
//!
//! 存储中的 `polling.properties` 可以在运行时覆盖轮询间隔与锚定时间。

use super::util::{parse_iso_duration, parse_time_of_day};
use config_store_abstractions::{
    ConfigStoreEventPublisher, ItemStore, PollingConfiguration, PollingConfigurationErrorOccurred,
};
use config_store_common::{ConfigStoreResult, PollingError, PollingResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 轮询间隔属性键
pub const POLLING_INTERVAL_PROPERTY: &str = "csc.dynamic-updates.polling-interval";
/// 锚定时间属性键
pub const TIME_OF_DAY_PROPERTY: &str = "csc.dynamic-updates.time-of-day-utc";
/// 默认的外部属性文件名
pub const DEFAULT_POLLING_PROPERTIES_FILE: &str = "polling.properties";

/// `polling.properties` 中的轮询属性
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollingProperties {
    pub polling_interval: Option<String>,
    pub time_of_day_utc: Option<String>,
}

impl PollingProperties {
    /// 解析 `key=value` 或 `key: value` 行，`#` 与 `!` 开头的行是注释
    pub fn parse(content: &str) -> Self {
        let values: HashMap<&str, &str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let index = line.find(['=', ':'])?;
                Some((line[..index].trim(), line[index + 1..].trim()))
            })
            .collect();

        let non_blank = |key: &str| {
            values
                .get(key)
                .filter(|value| !value.is_empty())
                .map(|value| (*value).to_string())
        };
        Self {
            polling_interval: non_blank(POLLING_INTERVAL_PROPERTY),
            time_of_day_utc: non_blank(TIME_OF_DAY_PROPERTY),
        }
    }

    /// 转换为轮询配置，外部键与调度运行时沿用 `base`
    ///
    /// 两个属性都必须存在且可解析，间隔是否合法由调度器判断。
    pub fn to_configuration(&self, base: &PollingConfiguration) -> PollingResult<PollingConfiguration> {
        let (Some(interval), Some(time_of_day)) = (&self.polling_interval, &self.time_of_day_utc)
        else {
            return Err(PollingError::MissingProperty {
                message: format!("null property in config: {self:?}"),
            });
        };

        let mut configuration = PollingConfiguration::new(parse_iso_duration(interval)?)
            .with_time_of_day_utc(parse_time_of_day(time_of_day)?);
        if let Some(key) = base.external_polling_properties_object_key() {
            configuration = configuration.with_external_polling_properties_object_key(key);
        }
        if let Some(scheduler) = base.scheduler() {
            configuration = configuration.with_scheduler(scheduler.clone());
        }
        Ok(configuration)
    }
}

/// 外部轮询配置来源
///
/// 定期读取存储中的属性文件，配置变化时通过 `watch` 通道发布。
pub struct ExternalPollingConfigurationSource {
    store: Arc<dyn ItemStore>,
    base: PollingConfiguration,
    publisher: Arc<dyn ConfigStoreEventPublisher>,
}

impl ExternalPollingConfigurationSource {
    pub fn new(
        store: Arc<dyn ItemStore>,
        base: PollingConfiguration,
        publisher: Arc<dyn ConfigStoreEventPublisher>,
    ) -> Self {
        Self {
            store,
            base,
            publisher,
        }
    }

    fn object_key(&self) -> &str {
        self.base
            .external_polling_properties_object_key()
            .unwrap_or(DEFAULT_POLLING_PROPERTIES_FILE)
    }

    /// 读取外部配置，属性文件不存在时返回 `None`
    pub async fn fetch(&self) -> ConfigStoreResult<Option<PollingConfiguration>> {
        let key = self.object_key();
        let Some(info) = self
            .store
            .list_item_info(key)
            .await?
            .into_iter()
            .find(|info| info.name() == key)
        else {
            debug!("外部轮询属性文件不存在: {}", key);
            return Ok(None);
        };

        let content = self.store.fetch_content(&info).await?;
        let configuration = PollingProperties::parse(&content).to_configuration(&self.base)?;
        Ok(Some(configuration))
    }

    /// 启动刷新任务
    ///
    /// 返回的接收端初始值为 `None`，外部配置首次读取成功或发生变化时更新。读取失败发布
    /// [`PollingConfigurationErrorOccurred`] 事件，已发布的配置保持不变。
    pub fn spawn(
        self,
        refresh_every: Duration,
    ) -> (watch::Receiver<Option<PollingConfiguration>>, JoinHandle<()>) {
        let (sender, receiver) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_every);
            loop {
                ticker.tick().await;
                if sender.is_closed() {
                    break;
                }
                self.refresh(&sender).await;
            }
        });
        (receiver, handle)
    }

    async fn refresh(&self, sender: &watch::Sender<Option<PollingConfiguration>>) {
        match self.fetch().await {
            Ok(Some(configuration)) => {
                let changed = sender.send_if_modified(|current| {
                    if current.as_ref() == Some(&configuration) {
                        false
                    } else {
                        *current = Some(configuration.clone());
                        true
                    }
                });
                if changed {
                    info!("读取到新的外部轮询配置: {}", configuration);
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("外部轮询配置读取失败 [{}]: {}", self.object_key(), e);
                let configuration = sender.borrow().clone().unwrap_or_else(|| self.base.clone());
                self.publisher
                    .publish(PollingConfigurationErrorOccurred { configuration, error: e }.into());
                warn!("保持当前轮询配置不变");
            }
        }
    }
}
