//! 实体身份信息
//!
//! 只包含条目身份（名称与标记），不需要加载内容就能判断实体是否有更新。

use config_store_abstractions::{ContentItemInfo, ContentItemType};
use config_store_common::{require_not_blank, EntityError, EntityResult, LogicalVersion, Versionable};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// 未指定时的版本号
pub const DEFAULT_VERSION_NUMBER: u32 = 0;

const SEPARATOR: char = '/';

/// 实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Policy,
    Pip,
    Access,
    Undefined,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Policy => "POLICY",
            Self::Pip => "PIP",
            Self::Access => "ACCESS",
            Self::Undefined => "UNDEFINED",
        };
        f.write_str(label)
    }
}

/// 实体身份信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    id: String,
    location_prefix: String,
    id_prefix: String,
    entity_type: EntityType,
    patch_version: u32,
    item_info: BTreeSet<ContentItemInfo>,
    version: String,
    prior_version: Option<Box<EntityInfo>>,
}

impl EntityInfo {
    /// 创建实体身份
    ///
    /// 版本是条目（相对位置前缀的名称 + 标记）的名称 UUID，同样的条目在不同根路径下得到同样的版本。
    pub fn new(
        id: impl Into<String>,
        location_prefix: impl Into<String>,
        entity_type: EntityType,
        items: impl IntoIterator<Item = ContentItemInfo>,
        patch_version: u32,
    ) -> EntityResult<Self> {
        let id = id.into();
        let location_prefix = location_prefix.into();
        require_not_blank(&id)?;
        require_not_blank(&location_prefix)?;

        let item_info: BTreeSet<ContentItemInfo> = items.into_iter().collect();
        let version = compute_version(&location_prefix, &item_info);
        let id_prefix = location_prefix
            .rfind(id.as_str())
            .map(|index| location_prefix[..index].to_string())
            .unwrap_or_default();

        Ok(Self {
            id,
            location_prefix,
            id_prefix,
            entity_type,
            patch_version,
            item_info,
            version,
            prior_version: None,
        })
    }

    /// 设置前一个版本，前一个版本的补丁版本号必须更小
    pub fn with_prior_version(mut self, prior: EntityInfo) -> EntityResult<Self> {
        if prior.patch_version >= self.patch_version {
            return Err(EntityError::invalid_info(format!(
                "prior version must have lower version number [this.versionNumber={}, priorVersion.versionNumber={}]",
                self.patch_version, prior.patch_version
            )));
        }
        self.prior_version = Some(Box::new(prior));
        Ok(self)
    }

    pub fn location_prefix(&self) -> &str {
        &self.location_prefix
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn patch_version(&self) -> u32 {
        self.patch_version
    }

    /// 组成实体的条目身份
    pub fn item_info(&self) -> &BTreeSet<ContentItemInfo> {
        &self.item_info
    }

    pub fn prior_version(&self) -> Option<&EntityInfo> {
        self.prior_version.as_deref()
    }
}

impl Versionable for EntityInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn id_prefix(&self) -> &str {
        &self.id_prefix
    }
}

impl LogicalVersion for EntityInfo {
    fn name(&self) -> &str {
        &self.id
    }

    fn major_version(&self) -> u32 {
        DEFAULT_VERSION_NUMBER
    }

    fn minor_version(&self) -> u32 {
        DEFAULT_VERSION_NUMBER
    }

    fn patch_version(&self) -> u32 {
        self.patch_version
    }
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityInfo{{version='{}', entityId='{}', versionNumber='{}', entityLocation='{}', type={}}}",
            self.version, self.id, self.patch_version, self.location_prefix, self.entity_type
        )
    }
}

fn compute_version(location_prefix: &str, items: &BTreeSet<ContentItemInfo>) -> String {
    let mut entries: Vec<String> = items
        .iter()
        .map(|info| {
            let name = info.name();
            let relative = name
                .find(location_prefix)
                .map(|index| &name[index + location_prefix.len()..])
                .unwrap_or(name);
            format!("{relative}\u{0}{}", info.tag())
        })
        .collect();
    entries.sort();
    Uuid::new_v5(&Uuid::NAMESPACE_OID, entries.join("\n").as_bytes()).to_string()
}

/// 转发 [`Versionable`] 与前一个版本的设置到内部的 [`EntityInfo`]
macro_rules! delegate_versionable {
    ($ty:ty) => {
        impl $ty {
            /// 设置前一个版本
            pub fn with_prior_version(mut self, prior: EntityInfo) -> EntityResult<Self> {
                self.base = self.base.with_prior_version(prior)?;
                Ok(self)
            }
        }

        impl Versionable for $ty {
            fn id(&self) -> &str {
                self.base.id()
            }

            fn version(&self) -> &str {
                self.base.version()
            }

            fn id_prefix(&self) -> &str {
                self.base.id_prefix()
            }
        }
    };
}

/// PIP 实体身份，名称即标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipInfo {
    base: EntityInfo,
}

impl PipInfo {
    pub fn new(
        entity_id: impl Into<String>,
        location_prefix: impl Into<String>,
        items: impl IntoIterator<Item = ContentItemInfo>,
    ) -> EntityResult<Self> {
        let base = EntityInfo::new(
            entity_id,
            location_prefix,
            EntityType::Pip,
            items,
            DEFAULT_VERSION_NUMBER,
        )?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &EntityInfo {
        &self.base
    }
}

delegate_versionable!(PipInfo);

impl LogicalVersion for PipInfo {
    fn name(&self) -> &str {
        self.base.id()
    }

    fn major_version(&self) -> u32 {
        DEFAULT_VERSION_NUMBER
    }

    fn minor_version(&self) -> u32 {
        DEFAULT_VERSION_NUMBER
    }

    fn patch_version(&self) -> u32 {
        self.base.patch_version()
    }
}

/// 访问控制实体身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessInfo {
    base: EntityInfo,
    policy_short_name: String,
    policy_full_name: String,
    policy_major_version: u32,
}

impl AccessInfo {
    pub fn new(
        entity_id: impl Into<String>,
        location_prefix: impl Into<String>,
        version_number: u32,
        policy_short_name: impl Into<String>,
        policy_full_name: impl Into<String>,
        policy_major_version: u32,
        items: impl IntoIterator<Item = ContentItemInfo>,
    ) -> EntityResult<Self> {
        let base = EntityInfo::new(
            entity_id,
            location_prefix,
            EntityType::Access,
            items,
            version_number,
        )?;
        Ok(Self {
            base,
            policy_short_name: policy_short_name.into(),
            policy_full_name: policy_full_name.into(),
            policy_major_version,
        })
    }

    pub fn base(&self) -> &EntityInfo {
        &self.base
    }

    pub fn policy_short_name(&self) -> &str {
        &self.policy_short_name
    }

    pub fn policy_full_name(&self) -> &str {
        &self.policy_full_name
    }

    pub fn policy_major_version(&self) -> u32 {
        self.policy_major_version
    }
}

delegate_versionable!(AccessInfo);

impl LogicalVersion for AccessInfo {
    fn name(&self) -> &str {
        &self.policy_full_name
    }

    fn major_version(&self) -> u32 {
        self.policy_major_version
    }

    fn minor_version(&self) -> u32 {
        DEFAULT_VERSION_NUMBER
    }

    fn patch_version(&self) -> u32 {
        self.base.patch_version()
    }
}

/// 策略定义：名称、位置与版本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDefinition {
    /// 策略所在位置，例如 `us_consumers/lob_a/policy_a/1.1/32`
    pub location: String,
    /// 完整名称，例如 `us_consumers/lob_a/policy_a`
    pub full_name: String,
    /// 短名称，例如 `policy_a`
    pub short_name: String,
    pub major_version: u32,
    pub minor_version: u32,
    pub patch_version: u32,
}

impl PolicyDefinition {
    /// 从 `<policy_path>` 与 `<major>.<minor>` 构建
    ///
    /// 完整名称取路径最后三段，不足三段时前面补空。
    pub fn from_path(policy_path: &str, policy_version: &str) -> EntityResult<Self> {
        let policy_path = policy_path.trim();
        if policy_path.is_empty() || policy_path.ends_with(SEPARATOR) {
            return Err(EntityError::invalid_info(format!(
                "policy path '{policy_path}' cannot be blank and may not end with '{SEPARATOR}'"
            )));
        }

        let segments: Vec<&str> = policy_path.split(SEPARATOR).collect();
        let mut name_parts = vec![""; 3usize.saturating_sub(segments.len())];
        name_parts.extend(segments.iter().rev().take(3).rev());
        let full_name = name_parts.join("/");
        let short_name = name_parts.last().copied().unwrap_or_default().to_string();

        let invalid = || EntityError::invalid_info(format!("Invalid major.minor version: '{policy_version}'"));
        let (major, minor) = policy_version.split_once('.').ok_or_else(invalid)?;
        let major_version = major.parse().map_err(|_| invalid())?;
        let minor_version = minor.parse().map_err(|_| invalid())?;

        Ok(Self {
            location: format!("{policy_path}{SEPARATOR}{policy_version}"),
            full_name,
            short_name,
            major_version,
            minor_version,
            patch_version: DEFAULT_VERSION_NUMBER,
        })
    }

    /// `<full_name>/<major>.<minor>`
    pub fn full_name_with_version(&self) -> String {
        format!("{}/{}.{}", self.full_name, self.major_version, self.minor_version)
    }
}

/// 策略实体身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyInfo {
    base: EntityInfo,
    policy_short_name: String,
    policy_full_name: String,
    policy_major_version: u32,
    policy_minor_version: u32,
    filtered_item_names: BTreeSet<String>,
}

impl PolicyInfo {
    /// 创建策略身份，无法识别类型的条目被过滤掉并记录在 `filtered_item_names` 中
    pub fn new(
        definition: &PolicyDefinition,
        items: impl IntoIterator<Item = ContentItemInfo>,
    ) -> EntityResult<Self> {
        let (recognized, filtered): (Vec<ContentItemInfo>, Vec<ContentItemInfo>) = items
            .into_iter()
            .partition(|info| ContentItemType::from_path(info.name()).is_recognized());

        let base = EntityInfo::new(
            definition.full_name_with_version(),
            definition.location.clone(),
            EntityType::Policy,
            recognized,
            definition.patch_version,
        )?;
        require_not_blank(&definition.short_name)?;
        require_not_blank(&definition.full_name)?;

        Ok(Self {
            base,
            policy_short_name: definition.short_name.clone(),
            policy_full_name: definition.full_name.clone(),
            policy_major_version: definition.major_version,
            policy_minor_version: definition.minor_version,
            filtered_item_names: filtered.into_iter().map(|info| info.name().to_string()).collect(),
        })
    }

    pub fn base(&self) -> &EntityInfo {
        &self.base
    }

    pub fn policy_short_name(&self) -> &str {
        &self.policy_short_name
    }

    pub fn policy_full_name(&self) -> &str {
        &self.policy_full_name
    }

    /// 被过滤掉的条目名称
    pub fn filtered_item_names(&self) -> &BTreeSet<String> {
        &self.filtered_item_names
    }
}

delegate_versionable!(PolicyInfo);

impl LogicalVersion for PolicyInfo {
    fn name(&self) -> &str {
        &self.policy_full_name
    }

    fn major_version(&self) -> u32 {
        self.policy_major_version
    }

    fn minor_version(&self) -> u32 {
        self.policy_minor_version
    }

    fn patch_version(&self) -> u32 {
        self.base.patch_version()
    }
}

/// 带变体信息的实体身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedEntityInfo {
    Policy(PolicyInfo),
    Pip(PipInfo),
    Access(AccessInfo),
    Simple(EntityInfo),
}

impl TypedEntityInfo {
    /// 公共身份信息
    pub fn base(&self) -> &EntityInfo {
        match self {
            Self::Policy(info) => info.base(),
            Self::Pip(info) => info.base(),
            Self::Access(info) => info.base(),
            Self::Simple(info) => info,
        }
    }

    /// 设置前一个版本
    pub fn with_prior_version(self, prior: EntityInfo) -> EntityResult<Self> {
        Ok(match self {
            Self::Policy(info) => Self::Policy(info.with_prior_version(prior)?),
            Self::Pip(info) => Self::Pip(info.with_prior_version(prior)?),
            Self::Access(info) => Self::Access(info.with_prior_version(prior)?),
            Self::Simple(info) => Self::Simple(info.with_prior_version(prior)?),
        })
    }
}

impl Versionable for TypedEntityInfo {
    fn id(&self) -> &str {
        self.base().id()
    }

    fn version(&self) -> &str {
        self.base().version()
    }

    fn id_prefix(&self) -> &str {
        self.base().id_prefix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, tag: &str) -> ContentItemInfo {
        ContentItemInfo::new(name, tag).unwrap()
    }

    #[test]
    fn test_version_ignores_location() {
        let a = EntityInfo::new(
            "lob/p/1.0",
            "root_a/lob/p/1.0",
            EntityType::Policy,
            [info("root_a/lob/p/1.0/config/defaults.json", "t1")],
            0,
        )
        .unwrap();
        let b = EntityInfo::new(
            "lob/p/1.0",
            "root_b/lob/p/1.0",
            EntityType::Policy,
            [info("root_b/lob/p/1.0/config/defaults.json", "t1")],
            0,
        )
        .unwrap();
        let c = EntityInfo::new(
            "lob/p/1.0",
            "root_b/lob/p/1.0",
            EntityType::Policy,
            [info("root_b/lob/p/1.0/config/defaults.json", "t2")],
            0,
        )
        .unwrap();

        assert_eq!(a.version(), b.version());
        assert_ne!(b.version(), c.version());
        assert_eq!(a.id_prefix(), "root_a/");
    }

    #[test]
    fn test_prior_version_must_be_lower() {
        let make = |patch| {
            EntityInfo::new("id", "id", EntityType::Undefined, Vec::new(), patch).unwrap()
        };
        assert!(make(1).with_prior_version(make(2)).is_err());
        assert!(make(1).with_prior_version(make(1)).is_err());
        let info = make(2).with_prior_version(make(1)).unwrap();
        assert_eq!(info.prior_version().unwrap().patch_version(), 1);
    }

    #[test]
    fn test_blank_id_rejected() {
        assert!(EntityInfo::new(" ", "loc", EntityType::Pip, Vec::new(), 0).is_err());
    }

    #[test]
    fn test_policy_definition_from_path() {
        let definition = PolicyDefinition::from_path("root/us_consumers/lob_a/policy_a", "1.2").unwrap();
        assert_eq!(definition.full_name, "us_consumers/lob_a/policy_a");
        assert_eq!(definition.short_name, "policy_a");
        assert_eq!(definition.location, "root/us_consumers/lob_a/policy_a/1.2");
        assert_eq!(definition.full_name_with_version(), "us_consumers/lob_a/policy_a/1.2");

        let short = PolicyDefinition::from_path("policy_a", "3.0").unwrap();
        assert_eq!(short.full_name, "//policy_a");

        assert!(PolicyDefinition::from_path("a/b/", "1.0").is_err());
        assert!(PolicyDefinition::from_path("a/b/c", "1").is_err());
        assert!(PolicyDefinition::from_path("a/b/c", "1.x").is_err());
    }

    #[test]
    fn test_policy_info_filters_unrecognized_items() {
        let definition = PolicyDefinition::from_path("us_consumers/lob_a/policy_a", "1.0").unwrap();
        let policy = PolicyInfo::new(
            &definition,
            [
                info("us_consumers/lob_a/policy_a/1.0/config/defaults.json", "a"),
                info("us_consumers/lob_a/policy_a/1.0/notes.txt", "b"),
            ],
        )
        .unwrap();

        assert_eq!(policy.base().item_info().len(), 1);
        assert!(policy
            .filtered_item_names()
            .contains("us_consumers/lob_a/policy_a/1.0/notes.txt"));
        assert_eq!(policy.id(), "us_consumers/lob_a/policy_a/1.0");
        assert_eq!(policy.minor_version_string(), "1.0");
        assert_eq!(policy.logical_version_string("/"), "us_consumers/lob_a/policy_a/1.0.0");
    }

    #[test]
    fn test_access_and_pip_logical_versions() {
        let access = AccessInfo::new(
            "lob/p/1/access-control",
            "lob/p/1/access-control/3",
            3,
            "p",
            "tenant/lob/p",
            1,
            Vec::new(),
        )
        .unwrap();
        assert_eq!(access.patch_version_string(), "1.0.3");
        assert_eq!(access.name(), "tenant/lob/p");

        let pip = PipInfo::new("pip_a/routes/r.xml", "pip_a/routes/r.xml", Vec::new()).unwrap();
        assert_eq!(pip.name(), "pip_a/routes/r.xml");
        assert_eq!(pip.patch_version_string(), "0.0.0");
        assert_eq!(pip.id_prefix(), "");
    }
}
