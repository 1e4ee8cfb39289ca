//! 配置匹配策略

use super::model::ConfigMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static APP_LEVEL_USE_CASE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<appLevelToken>(?:(?:[-_A-Za-z0-9]+[.]){3}[-_A-Za-z0-9]+)?)(?:[.][-_A-Za-z0-9]*)?$")
        .expect("static regex")
});

/// 配置匹配策略
///
/// 决定某个用例标识由哪一层合并后的配置来回答。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingStrategy {
    /// 仅精确匹配用例
    ExactOnly,
    /// 仅匹配用例标识中派生出的应用级用例
    AppLevelOnly,
    /// 精确匹配，其次应用级匹配，最后回退到默认值
    AllNonNull,
    /// 总是返回默认值
    DefaultOnly,
    /// 返回策略级不可覆盖配置
    FeaturesOnly,
}

impl MatchingStrategy {
    /// 解析用例对应的配置
    pub fn resolve<'a>(
        self,
        use_case: Option<&str>,
        use_case_map: &'a HashMap<String, ConfigMap>,
        defaults: &'a ConfigMap,
        features: Option<&'a ConfigMap>,
    ) -> Option<&'a ConfigMap> {
        match self {
            Self::ExactOnly => use_case.and_then(|name| use_case_map.get(name)),
            Self::AppLevelOnly => use_case
                .and_then(app_level_use_case)
                .and_then(|name| use_case_map.get(name)),
            Self::DefaultOnly => Some(defaults),
            Self::FeaturesOnly => features,
            Self::AllNonNull => Self::ExactOnly
                .resolve(use_case, use_case_map, defaults, features)
                .or_else(|| Self::AppLevelOnly.resolve(use_case, use_case_map, defaults, features))
                .or(Some(defaults)),
        }
    }
}

/// 从业务事件格式的用例中取出应用级用例
///
/// `a.b.c.d.e` 与 `a.b.c.d` 都得到 `a.b.c.d`，其他格式没有应用级用例。
pub fn app_level_use_case(use_case: &str) -> Option<&str> {
    APP_LEVEL_USE_CASE_PATTERN
        .captures(use_case)
        .and_then(|captures| captures.name("appLevelToken"))
        .map(|token| token.as_str())
        .filter(|token| !token.is_empty())
}
