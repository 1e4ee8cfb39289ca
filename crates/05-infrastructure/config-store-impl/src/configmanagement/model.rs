//! 配置管理模型与合并引擎

use super::strategy::MatchingStrategy;
use config_store_common::{ConfigManagementError, ConfigManagementResult};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// 单层配置：键到值
pub type ConfigMap = HashMap<String, Value>;

/// 配置管理模型
///
/// 构建后不可变。每个用例层都是完整合并后的结果（默认值 + 不可覆盖值 + 用例覆盖），
/// 而不是差异。查询返回借用，调用方需要修改时自行克隆。
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigManagementModel {
    defaults: ConfigMap,
    use_case_map: HashMap<String, ConfigMap>,
    features_map: Option<ConfigMap>,
}

impl ConfigManagementModel {
    /// 由默认值和用例层构建
    pub fn new(
        defaults: &ConfigMap,
        use_cases: &HashMap<String, ConfigMap>,
    ) -> ConfigManagementResult<Self> {
        Self::build(defaults, use_cases, None)
    }

    /// 合并默认值、用例层和不可覆盖值
    ///
    /// 不可覆盖键出现在默认值或任何用例自身的配置中时返回冲突错误。
    pub fn build(
        defaults: &ConfigMap,
        use_cases: &HashMap<String, ConfigMap>,
        non_override_values: Option<&ConfigMap>,
    ) -> ConfigManagementResult<Self> {
        let non_override = non_override_values.filter(|values| !values.is_empty());

        let mut effective_defaults = defaults.clone();
        if let Some(values) = non_override {
            for (key, value) in values {
                if effective_defaults.contains_key(key) {
                    return Err(ConfigManagementError::conflict(key.clone()));
                }
                effective_defaults.insert(key.clone(), value.clone());
            }
        }

        let mut use_case_map = HashMap::with_capacity(use_cases.len());
        for (name, overrides) in use_cases {
            if let Some(values) = non_override {
                if let Some(key) = overrides.keys().find(|key| values.contains_key(*key)) {
                    return Err(ConfigManagementError::conflict(key.clone()));
                }
            }
            let mut merged = effective_defaults.clone();
            merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
            use_case_map.insert(name.clone(), merged);
        }

        debug!(
            "构建配置管理模型: 默认键数 {}, 用例数 {}, 不可覆盖键数 {}",
            effective_defaults.len(),
            use_case_map.len(),
            non_override.map_or(0, HashMap::len)
        );

        Ok(Self {
            defaults: effective_defaults,
            use_case_map,
            features_map: non_override_values.cloned(),
        })
    }

    /// 生效的默认值（已包含不可覆盖值）
    pub fn defaults(&self) -> &ConfigMap {
        &self.defaults
    }

    /// 合并后的用例层
    pub fn use_case_map(&self) -> &HashMap<String, ConfigMap> {
        &self.use_case_map
    }

    /// 策略级不可覆盖配置
    pub fn features_map(&self) -> Option<&ConfigMap> {
        self.features_map.as_ref()
    }

    /// 键是否在默认值中定义
    pub fn is_valid_key(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// 用例是否被精确定义
    pub fn is_use_case_defined(&self, use_case: Option<&str>) -> bool {
        self.get_configuration(use_case, MatchingStrategy::ExactOnly)
            .is_some()
    }

    /// 用例对应的应用级用例是否被定义
    pub fn is_app_level_use_case_defined(&self, use_case: Option<&str>) -> bool {
        self.get_configuration(use_case, MatchingStrategy::AppLevelOnly)
            .is_some()
    }

    /// 按策略获取配置
    pub fn get_configuration(
        &self,
        use_case: Option<&str>,
        strategy: MatchingStrategy,
    ) -> Option<&ConfigMap> {
        strategy.resolve(
            use_case,
            &self.use_case_map,
            &self.defaults,
            self.features_map.as_ref(),
        )
    }

    /// 按策略获取单个值
    pub fn get_value(
        &self,
        key: &str,
        use_case: Option<&str>,
        strategy: MatchingStrategy,
    ) -> Option<&Value> {
        self.get_configuration(use_case, strategy)
            .and_then(|config| config.get(key))
    }

    /// 获取值，找不到时返回错误
    ///
    /// 使用 [`MatchingStrategy::AllNonNull`]，调用前应先用 [`Self::is_valid_key`] 校验键。
    pub fn get_value_or_throw(
        &self,
        key: &str,
        use_case: Option<&str>,
    ) -> ConfigManagementResult<&Value> {
        self.get_value(key, use_case, MatchingStrategy::AllNonNull)
            .ok_or_else(|| ConfigManagementError::NotFound {
                key: key.to_string(),
            })
    }
}
