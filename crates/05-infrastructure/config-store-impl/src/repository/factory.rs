//! 实体身份工厂
//!
//! 按对象名称的正则把存储中的条目归组成实体，每个工厂负责一种实体类型。

use crate::model::{
    AccessInfo, EntityType, PipInfo, PolicyDefinition, PolicyInfo, TypedEntityInfo,
    DEFAULT_VERSION_NUMBER,
};
use config_store_abstractions::ContentItemInfo;
use config_store_common::{EntityError, EntityResult, Versionable};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const LOCATION_PREFIX: &str = "locationPrefix";
const ENTITY_ID: &str = "entityId";
const VERSION_NUMBER: &str = "versionNumber";

static POLICY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<locationPrefix>.*?(?P<entityId>(?P<policyFullName>(?:[-_a-zA-Z\d]+/){2}(?P<policyShortName>[-_a-zA-Z0-9]+))/(?P<policyMajorVersion>\d+)\.(?P<policyMinorVersion>\d+))(?:/(?P<policyPatchVersion>\d+))?)/(?:policy-metadata\.json|process/.*|rules/.*|config/.*)$",
    )
    .expect("static regex")
});

static ACCESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<locationPrefix>.*?(?P<entityId>(?P<policyFullName>(?:[-_a-zA-Z\d]+/){2}(?P<policyShortName>[-_a-zA-Z0-9]+))/(?P<policyMajorVersion>\d+)/access-control)/(?P<versionNumber>\d+)/policy-access\.json)$",
    )
    .expect("static regex")
});

static PIP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<locationPrefix>.*?(?P<entityId>[-_a-zA-Z\d]+/routes/*.*\.xml))$")
        .expect("static regex")
});

/// 实体身份工厂
#[derive(Debug, Clone, Copy)]
pub struct EntityInfoFactory {
    entity_type: EntityType,
    pattern: &'static Lazy<Regex>,
}

impl EntityInfoFactory {
    pub fn policy() -> Self {
        Self {
            entity_type: EntityType::Policy,
            pattern: &POLICY_PATTERN,
        }
    }

    pub fn access() -> Self {
        Self {
            entity_type: EntityType::Access,
            pattern: &ACCESS_PATTERN,
        }
    }

    pub fn pip() -> Self {
        Self {
            entity_type: EntityType::Pip,
            pattern: &PIP_PATTERN,
        }
    }

    /// 所有内置工厂
    pub fn all() -> Vec<Self> {
        vec![Self::policy(), Self::access(), Self::pip()]
    }

    /// 指定类型的工厂，[`EntityType::Undefined`] 没有工厂
    pub fn for_type(entity_type: EntityType) -> Option<Self> {
        match entity_type {
            EntityType::Policy => Some(Self::policy()),
            EntityType::Access => Some(Self::access()),
            EntityType::Pip => Some(Self::pip()),
            EntityType::Undefined => None,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// 对象名称不匹配时返回 `None`
    pub fn new_builder(&self, object_name: &str) -> EntityResult<Option<EntityBuilder>> {
        let Some(captures) = self.pattern.captures(object_name) else {
            return Ok(None);
        };

        let location_prefix = group(&captures, LOCATION_PREFIX).unwrap_or_default();
        let id = group(&captures, ENTITY_ID).unwrap_or_default();
        if !location_prefix.contains(id.as_str()) {
            return Err(EntityError::invalid_info(format!(
                "location prefix '{location_prefix}' must contain entity id '{id}' [object={object_name}]"
            )));
        }

        let version_number = match group(&captures, VERSION_NUMBER) {
            Some(value) => parse_number(&value, VERSION_NUMBER)?,
            None => DEFAULT_VERSION_NUMBER,
        };

        let groups = self
            .pattern
            .capture_names()
            .flatten()
            .filter_map(|name| group(&captures, name).map(|value| (name.to_string(), value)))
            .collect();

        Ok(Some(EntityBuilder {
            entity_type: self.entity_type,
            id,
            location_prefix,
            version_number,
            groups,
            items: BTreeSet::new(),
        }))
    }
}

fn group(captures: &Captures<'_>, name: &str) -> Option<String> {
    captures.name(name).map(|m| m.as_str().to_string())
}

fn parse_number(value: &str, label: &str) -> EntityResult<u32> {
    value
        .parse()
        .map_err(|_| EntityError::invalid_info(format!("invalid {label} '{value}'")))
}

/// 实体构建器：收集同一位置下的条目并生成实体身份
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    entity_type: EntityType,
    id: String,
    location_prefix: String,
    version_number: u32,
    groups: HashMap<String, String>,
    items: BTreeSet<ContentItemInfo>,
}

impl EntityBuilder {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location_prefix(&self) -> &str {
        &self.location_prefix
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    /// 条目名称等于位置前缀或位于其下时接收，返回是否接收
    pub fn add_item(&mut self, info: &ContentItemInfo) -> bool {
        let name = info.name();
        let accepted = name == self.location_prefix
            || name
                .strip_prefix(self.location_prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'));
        if accepted {
            self.items.insert(info.clone());
        }
        accepted
    }

    fn required_group(&self, name: &str) -> EntityResult<&str> {
        self.groups.get(name).map(String::as_str).ok_or_else(|| {
            EntityError::invalid_info(format!(
                "missing '{name}' for entity '{}' at '{}'",
                self.id, self.location_prefix
            ))
        })
    }

    fn number_group(&self, name: &str) -> EntityResult<u32> {
        parse_number(self.required_group(name)?, name)
    }

    /// 生成实体身份
    pub fn build(self) -> EntityResult<TypedEntityInfo> {
        match self.entity_type {
            EntityType::Policy => {
                let patch_version = match self.groups.get("policyPatchVersion") {
                    Some(value) => parse_number(value, "policyPatchVersion")?,
                    None => DEFAULT_VERSION_NUMBER,
                };
                let definition = PolicyDefinition {
                    location: self.location_prefix.clone(),
                    full_name: self.required_group("policyFullName")?.to_string(),
                    short_name: self.required_group("policyShortName")?.to_string(),
                    major_version: self.number_group("policyMajorVersion")?,
                    minor_version: self.number_group("policyMinorVersion")?,
                    patch_version,
                };
                Ok(TypedEntityInfo::Policy(PolicyInfo::new(&definition, self.items)?))
            }
            EntityType::Access => {
                let info = AccessInfo::new(
                    self.id.clone(),
                    self.location_prefix.clone(),
                    self.version_number,
                    self.required_group("policyShortName")?,
                    self.required_group("policyFullName")?,
                    self.number_group("policyMajorVersion")?,
                    self.items.iter().cloned(),
                )?;
                Ok(TypedEntityInfo::Access(info))
            }
            EntityType::Pip => Ok(TypedEntityInfo::Pip(PipInfo::new(
                self.id,
                self.location_prefix,
                self.items,
            )?)),
            EntityType::Undefined => Err(EntityError::invalid_info(format!(
                "no entity generator for '{}'",
                self.id
            ))),
        }
    }
}

/// 把有序的条目身份归组为实体身份
///
/// 同一标识的多个位置按补丁版本排序，只保留最新的一个，较旧的挂在它的前一个版本链上。
pub fn group_entity_infos(
    factories: &[EntityInfoFactory],
    item_infos: impl IntoIterator<Item = ContentItemInfo>,
) -> Vec<EntityResult<TypedEntityInfo>> {
    let mut sorted: Vec<ContentItemInfo> = item_infos.into_iter().collect();
    sorted.sort();

    let mut builders: BTreeMap<String, EntityBuilder> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut results = Vec::new();

    for info in &sorted {
        if let Some(builder) = current.as_ref().and_then(|key| builders.get_mut(key)) {
            if builder.add_item(info) {
                continue;
            }
        }

        current = None;
        for factory in factories {
            match factory.new_builder(info.name()) {
                Ok(Some(builder)) => {
                    let key = builder.location_prefix().to_string();
                    let entry = builders.entry(key.clone()).or_insert(builder);
                    entry.add_item(info);
                    current = Some(key);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    results.push(Err(e));
                    break;
                }
            }
        }
        if current.is_none() {
            debug!("条目没有匹配的实体: {}", info.name());
        }
    }

    let mut by_id: BTreeMap<String, Vec<TypedEntityInfo>> = BTreeMap::new();
    for builder in builders.into_values() {
        match builder.build() {
            Ok(info) => by_id.entry(info.id().to_string()).or_default().push(info),
            Err(e) => results.push(Err(e)),
        }
    }

    for (_, mut versions) in by_id {
        versions.sort_by_key(|info| info.base().patch_version());
        results.push(chain_versions(versions));
    }
    results
}

fn chain_versions(versions: Vec<TypedEntityInfo>) -> EntityResult<TypedEntityInfo> {
    let mut chained: Option<TypedEntityInfo> = None;
    for info in versions {
        chained = Some(match chained {
            Some(prior) if prior.base().patch_version() < info.base().patch_version() => {
                info.with_prior_version(prior.base().clone())?
            }
            Some(prior) => {
                return Err(EntityError::invalid_info(format!(
                    "duplicate version {} for entity '{}'",
                    prior.base().patch_version(),
                    prior.id()
                )))
            }
            None => info,
        });
    }
    chained.ok_or_else(|| EntityError::invalid_info("no versions to chain"))
}
