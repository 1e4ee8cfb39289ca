//! 配置存储客户端设置
//!
//! 通过 `config` crate 从可选的配置文件和 `CSC__` 前缀的环境变量加载。

use crate::polling::{parse_iso_duration, parse_time_of_day};
use config_store_abstractions::PollingConfiguration;
use config_store_common::{ConfigStoreError, ConfigStoreResult, PollingResult};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error};

const ENVIRONMENT_PREFIX: &str = "CSC";
const ENVIRONMENT_SEPARATOR: &str = "__";

/// 动态更新设置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DynamicUpdateSettings {
    /// 是否启用定时轮询
    pub enabled: bool,
    /// ISO-8601 轮询间隔
    pub polling_interval: String,
    /// 锚定时间 `HH:MM[:SS]`
    pub time_of_day_utc: String,
    /// 外部轮询属性文件的对象键
    pub external_polling_properties_object_key: Option<String>,
}

impl Default for DynamicUpdateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            polling_interval: "PT24H".to_string(),
            time_of_day_utc: "02:00".to_string(),
            external_polling_properties_object_key: None,
        }
    }
}

impl DynamicUpdateSettings {
    /// 解析为轮询配置，间隔是否合法由调度器判断
    pub fn to_polling_configuration(&self) -> PollingResult<PollingConfiguration> {
        let mut configuration = PollingConfiguration::new(parse_iso_duration(&self.polling_interval)?)
            .with_time_of_day_utc(parse_time_of_day(&self.time_of_day_utc)?);
        if let Some(key) = &self.external_polling_properties_object_key {
            configuration = configuration.with_external_polling_properties_object_key(key);
        }
        Ok(configuration)
    }
}

/// 配置存储设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigStoreSettings {
    /// 存储中的根前缀
    pub root_prefix: String,
    /// 运行环境，决定叠加哪个 `features-<env>.json`
    pub environment: Option<String>,
    pub dynamic_updates: DynamicUpdateSettings,
}

impl ConfigStoreSettings {
    /// 只从环境变量加载
    pub fn load() -> ConfigStoreResult<Self> {
        Self::build(None)
    }

    /// 从配置文件和环境变量加载，环境变量优先
    pub fn load_from(path: impl AsRef<Path>) -> ConfigStoreResult<Self> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> ConfigStoreResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("加载配置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENVIRONMENT_PREFIX)
                    .prefix_separator(ENVIRONMENT_SEPARATOR)
                    .separator(ENVIRONMENT_SEPARATOR),
            )
            .build()
            .map_err(|e| {
                error!("配置构建失败: {}", e);
                ConfigStoreError::Settings {
                    message: e.to_string(),
                }
            })?;

        settings.try_deserialize().map_err(|e| {
            error!("配置绑定失败: {}", e);
            ConfigStoreError::Settings {
                message: e.to_string(),
            }
        })
    }
}
