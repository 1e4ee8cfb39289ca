//! 存储条目定义
//!
//! [`ContentItem`] 是从对象存储取回的最小内容单元，`(name, tag)` 是它的身份。

use config_store_common::{content_hash, require_not_blank, EntityError, EntityResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

static RULES_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*/\d+\.\d+(?:/\d+)?/rules/*.*\.dmn$").expect("static regex"));
static PROCESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*/\d+\.\d+(?:/\d+)?/process/*.*\.xml$").expect("static regex"));
static ROUTE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*/routes/*.*\.xml$").expect("static regex"));
static CONFIG_DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*/\d+\.\d+(?:/\d+)?/config/defaults\.json$").expect("static regex")
});
static CONFIG_USECASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*/\d+\.\d+(?:/\d+)?/config/*.*\.json$").expect("static regex"));
static CONFIG_RESERVED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:.*/defaults\.json|.*/schema\.json|.*/features.*\.json)$")
        .expect("static regex")
});
static CONFIG_SCHEMA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*/\d+\.\d+(?:/\d+)?/config/schema\.json$").expect("static regex")
});
static CONFIG_FEATURES_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*/\d+\.\d+(?:/\d+)?/config/features(?:-[A-Za-z-].*)?\.json$")
        .expect("static regex")
});
static POLICY_STATUS_SPARSE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*/\d+\.\d+(?:/\d+)?/policy-metadata\.json$").expect("static regex")
});
static ACCESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*/access-control/\d+/policy-access\.json$").expect("static regex")
});

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentItemType {
    /// 默认配置 `config/defaults.json`
    ConfigDefault,
    /// 配置 schema `config/schema.json`
    ConfigSchema,
    /// 用例覆盖配置 `config/<usecase>.json`
    ConfigUsecase,
    /// 策略级不可覆盖配置 `config/features[-env].json`
    ConfigFeatures,
    /// 流程定义
    Process,
    /// 规则定义
    Rules,
    /// 策略元数据 `policy-metadata.json`
    PolicyStatusSparse,
    /// 路由文件
    Route,
    /// 访问控制文档
    Access,
    /// 无法识别
    Unrecognized,
}

impl ContentItemType {
    /// 根据对象路径推断条目类型
    pub fn from_path(path: &str) -> Self {
        if RULES_PATTERN.is_match(path) {
            Self::Rules
        } else if ROUTE_PATTERN.is_match(path) {
            Self::Route
        } else if PROCESS_PATTERN.is_match(path) {
            Self::Process
        } else if POLICY_STATUS_SPARSE_PATTERN.is_match(path) {
            Self::PolicyStatusSparse
        } else if !CONFIG_RESERVED_PATTERN.is_match(path) && CONFIG_USECASE_PATTERN.is_match(path)
        {
            Self::ConfigUsecase
        } else if CONFIG_DEFAULT_PATTERN.is_match(path) {
            Self::ConfigDefault
        } else if CONFIG_SCHEMA_PATTERN.is_match(path) {
            Self::ConfigSchema
        } else if CONFIG_FEATURES_PATTERN.is_match(path) {
            Self::ConfigFeatures
        } else if ACCESS_PATTERN.is_match(path) {
            Self::Access
        } else {
            Self::Unrecognized
        }
    }

    /// 是否为可识别的类型
    pub fn is_recognized(self) -> bool {
        self != Self::Unrecognized
    }
}

impl fmt::Display for ContentItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConfigDefault => "CONFIG_DEFAULT",
            Self::ConfigSchema => "CONFIG_SCHEMA",
            Self::ConfigUsecase => "CONFIG_USECASE",
            Self::ConfigFeatures => "CONFIG_FEATURES",
            Self::Process => "PROCESS",
            Self::Rules => "RULES",
            Self::PolicyStatusSparse => "POLICY_STATUS_SPARSE",
            Self::Route => "ROUTE",
            Self::Access => "ACCESS",
            Self::Unrecognized => "UNRECOGNIZED",
        };
        f.write_str(label)
    }
}

/// 存储对象的身份信息
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentItemInfo {
    name: String,
    tag: String,
}

impl ContentItemInfo {
    /// 创建条目身份，名称不能为空白
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> EntityResult<Self> {
        let name = name.into();
        require_not_blank(&name)?;
        Ok(Self {
            name,
            tag: tag.into(),
        })
    }

    /// 对象名称（完整路径）
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 版本标记
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// 带内容的存储条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    info: ContentItemInfo,
    item_type: ContentItemType,
    content: String,
}

impl ContentItem {
    /// 创建条目，标记取内容摘要，类型由路径推断
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> EntityResult<Self> {
        let content = content.into();
        let tag = content_hash(&content);
        Self::with_tag(name, content, tag)
    }

    /// 使用指定标记创建条目，类型由路径推断
    pub fn with_tag(
        name: impl Into<String>,
        content: impl Into<String>,
        tag: impl Into<String>,
    ) -> EntityResult<Self> {
        let info = ContentItemInfo::new(name, tag)?;
        let item_type = ContentItemType::from_path(info.name());
        Ok(Self {
            info,
            item_type,
            content: content.into(),
        })
    }

    /// 从已知身份创建条目
    pub fn from_info(info: ContentItemInfo, content: impl Into<String>) -> Self {
        let item_type = ContentItemType::from_path(info.name());
        Self {
            info,
            item_type,
            content: content.into(),
        }
    }

    /// 显式指定类型
    pub fn with_type(mut self, item_type: ContentItemType) -> Self {
        self.item_type = item_type;
        self
    }

    /// 身份信息
    pub fn info(&self) -> &ContentItemInfo {
        &self.info
    }

    /// 对象名称
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// 版本标记
    pub fn tag(&self) -> &str {
        self.info.tag()
    }

    /// 条目类型
    pub fn item_type(&self) -> ContentItemType {
        self.item_type
    }

    /// 原始内容
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// 条目集合，以 `(name, tag)` 为键，迭代顺序稳定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentItemSet {
    items: BTreeMap<ContentItemInfo, ContentItem>,
}

impl ContentItemSet {
    /// 从条目构建集合，身份重复时失败
    pub fn from_items(items: impl IntoIterator<Item = ContentItem>) -> EntityResult<Self> {
        let mut map = BTreeMap::new();
        for item in items {
            if let Some(existing) = map.insert(item.info().clone(), item) {
                return Err(EntityError::invalid_info(format!(
                    "duplicate item identity: name={}, tag={}",
                    existing.name(),
                    existing.tag()
                )));
            }
        }
        Ok(Self { items: map })
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 遍历所有条目
    pub fn iter(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.values()
    }

    /// 所有条目的身份信息
    pub fn infos(&self) -> impl Iterator<Item = &ContentItemInfo> {
        self.items.keys()
    }

    /// 按类型过滤
    pub fn get_items(&self, item_type: ContentItemType) -> Vec<&ContentItem> {
        self.iter()
            .filter(|item| item.item_type() == item_type)
            .collect()
    }

    /// 获取某类型的唯一条目：没有则为 `None`，多于一个则失败
    pub fn get_item(&self, item_type: ContentItemType) -> EntityResult<Option<&ContentItem>> {
        let matches = self.get_items(item_type);
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.into_iter().next()),
            actual => Err(EntityError::Cardinality {
                item_type: item_type.to_string(),
                expected: "at most one".to_string(),
                actual,
            }),
        }
    }

    /// 集合必须恰好包含一个条目
    pub fn single_item(&self, label: &str) -> EntityResult<&ContentItem> {
        let mut iter = self.iter();
        match (iter.next(), self.len()) {
            (Some(item), 1) => Ok(item),
            (_, actual) => Err(EntityError::Cardinality {
                item_type: label.to_string(),
                expected: "exactly one".to_string(),
                actual,
            }),
        }
    }
}

impl<'a> IntoIterator for &'a ContentItemSet {
    type Item = &'a ContentItem;
    type IntoIter = std::collections::btree_map::Values<'a, ContentItemInfo, ContentItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}
