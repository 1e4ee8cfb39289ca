//! 实体模型
//!
//! 实体是某个存储对象组在某一时刻的不可变快照。策略实体的配置管理模型在首次访问时构建并缓存。

use super::access::PolicyAccess;
use super::entity_info::{AccessInfo, EntityInfo, EntityType, PipInfo, PolicyInfo};
use crate::configmanagement::{ConfigManagementModel, ConfigManagementModelParser};
use crate::parsing::{PolicyManifestJsonFileParser, StoredPolicyAccessParser};
use config_store_abstractions::{
    ContentItem, ContentItemSet, ContentItemType, EntityActivationStatus, PolicyAccessParser,
    PolicyManifestParser, PolicyMetadata,
};
use config_store_common::{
    ConfigManagementError, ConfigManagementResult, EntityError, EntityResult,
    ManifestProcessingError, Versionable,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, warn};

type MemoizedModel = ConfigManagementResult<Option<Arc<ConfigManagementModel>>>;

/// 策略实体
#[derive(Debug)]
pub struct PolicyEntity {
    info: PolicyInfo,
    items: ContentItemSet,
    metadata: PolicyMetadata,
    environment: Option<String>,
    config_management_model: OnceCell<MemoizedModel>,
}

impl PolicyEntity {
    /// 使用 JSON 清单解析器创建
    pub fn new(info: PolicyInfo, items: ContentItemSet) -> EntityResult<Self> {
        Self::with_parser(info, items, &PolicyManifestJsonFileParser)
    }

    /// 使用指定的清单解析器创建
    ///
    /// `policy-metadata.json` 缺失、无法解析或没有状态时失败。
    pub fn with_parser(
        info: PolicyInfo,
        items: ContentItemSet,
        parser: &dyn PolicyManifestParser,
    ) -> EntityResult<Self> {
        let metadata = parse_policy_metadata(&info, &items, parser)?;
        Ok(Self::with_metadata(info, items, metadata))
    }

    /// 使用已知的元数据创建
    pub fn with_metadata(info: PolicyInfo, items: ContentItemSet, metadata: PolicyMetadata) -> Self {
        Self {
            info,
            items,
            metadata,
            environment: None,
            config_management_model: OnceCell::new(),
        }
    }

    /// 指定缓存模型使用的环境，决定叠加哪个 `features-<env>.json`
    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self.config_management_model = OnceCell::new();
        self
    }

    pub fn info(&self) -> &PolicyInfo {
        &self.info
    }

    pub fn items(&self) -> &ContentItemSet {
        &self.items
    }

    pub fn metadata(&self) -> &PolicyMetadata {
        &self.metadata
    }

    /// 配置管理模型，首次访问时构建，之后（包括失败）都返回同一个结果
    pub fn config_management_model(
        &self,
    ) -> ConfigManagementResult<Option<Arc<ConfigManagementModel>>> {
        self.config_management_model
            .get_or_init(|| {
                let result = self
                    .config_management_model_for_env(self.environment.as_deref())
                    .map(|model| model.map(Arc::new));
                if let Err(e) = &result {
                    warn!("构建配置管理模型失败: {}, 原因: {}", self.info.id(), e);
                }
                result
            })
            .clone()
    }

    /// 按环境构建配置管理模型，不缓存
    pub fn config_management_model_for_env(
        &self,
        environment: Option<&str>,
    ) -> ConfigManagementResult<Option<ConfigManagementModel>> {
        let single = |item_type| {
            self.items
                .get_item(item_type)
                .map(|item| item.map(ContentItem::content))
                .map_err(|e| ConfigManagementError::validation(e.to_string()))
        };
        let defaults = single(ContentItemType::ConfigDefault)?;
        let schema = single(ContentItemType::ConfigSchema)?;
        let use_cases = self.items.get_items(ContentItemType::ConfigUsecase);
        let features = self.items.get_items(ContentItemType::ConfigFeatures);

        debug!("构建配置管理模型: {}", self.info.base().location_prefix());
        ConfigManagementModelParser::parse(
            self.info.base().location_prefix(),
            defaults,
            schema,
            &use_cases,
            &features,
            environment,
        )
    }

    /// 流程条目
    pub fn process_items(&self) -> Vec<&ContentItem> {
        self.items.get_items(ContentItemType::Process)
    }

    /// 规则条目
    pub fn rule_items(&self) -> Vec<&ContentItem> {
        self.items.get_items(ContentItemType::Rules)
    }

    pub fn entity_activation_status(&self) -> EntityActivationStatus {
        self.metadata.status()
    }

    pub fn compile_version(&self) -> i32 {
        self.metadata.compile_version()
    }
}

fn parse_policy_metadata(
    info: &PolicyInfo,
    items: &ContentItemSet,
    parser: &dyn PolicyManifestParser,
) -> EntityResult<PolicyMetadata> {
    let invalid = |message: String, source: Option<ManifestProcessingError>| {
        EntityError::InvalidManifest {
            entity: info.base().to_string(),
            message,
            source,
        }
    };
    let item = items
        .get_item(ContentItemType::PolicyStatusSparse)
        .map_err(|e| invalid(e.to_string(), None))?
        .ok_or_else(|| invalid("policy-metadata.json is missing".to_string(), None))?;

    parser
        .parse_policy_metadata(item.name(), item.content())
        .map_err(|e| invalid(e.message.clone(), Some(e)))?
        .ok_or_else(|| {
            invalid(
                "Unrecognized or unknown Status in policy-metadata.json file".to_string(),
                None,
            )
        })
}

/// PIP 实体
#[derive(Debug, Clone)]
pub struct PipEntity {
    info: PipInfo,
    items: ContentItemSet,
}

impl PipEntity {
    pub fn new(info: PipInfo, items: ContentItemSet) -> Self {
        Self { info, items }
    }

    pub fn info(&self) -> &PipInfo {
        &self.info
    }

    pub fn items(&self) -> &ContentItemSet {
        &self.items
    }

    /// 路由文件，条目集合必须恰好包含一个条目
    pub fn route_file(&self) -> EntityResult<&ContentItem> {
        self.items.single_item(&ContentItemType::Route.to_string())
    }
}

/// 访问控制实体，创建时即解析访问控制文档
#[derive(Debug, Clone)]
pub struct AccessEntity {
    info: AccessInfo,
    items: ContentItemSet,
    policy_access: PolicyAccess,
}

impl AccessEntity {
    /// 使用默认的访问控制解析器创建
    pub fn new(info: AccessInfo, items: ContentItemSet) -> EntityResult<Self> {
        let parser = StoredPolicyAccessParser::new().map_err(EntityError::access_parsing)?;
        Self::with_parser(info, items, &parser)
    }

    /// 使用指定的解析器创建，任何解析失败都归为 [`EntityError::AccessParsing`]
    pub fn with_parser(
        info: AccessInfo,
        items: ContentItemSet,
        parser: &dyn PolicyAccessParser,
    ) -> EntityResult<Self> {
        let item = items
            .single_item(&ContentItemType::Access.to_string())
            .map_err(|e| EntityError::access_parsing(e.to_string()))?;
        let stored = parser
            .parse_policy_access(item.content())
            .map_err(EntityError::access_parsing)?;
        let policy_access = PolicyAccess::from_stored(&info, &stored)?;
        Ok(Self {
            info,
            items,
            policy_access,
        })
    }

    pub fn info(&self) -> &AccessInfo {
        &self.info
    }

    pub fn items(&self) -> &ContentItemSet {
        &self.items
    }

    pub fn policy_access(&self) -> &PolicyAccess {
        &self.policy_access
    }
}

/// 没有派生状态的实体
#[derive(Debug, Clone)]
pub struct SimpleEntity {
    info: EntityInfo,
    items: ContentItemSet,
}

impl SimpleEntity {
    pub fn new(info: EntityInfo, items: ContentItemSet) -> Self {
        Self { info, items }
    }

    pub fn info(&self) -> &EntityInfo {
        &self.info
    }

    pub fn items(&self) -> &ContentItemSet {
        &self.items
    }
}

/// 实体
#[derive(Debug)]
pub enum Entity {
    Policy(PolicyEntity),
    Pip(PipEntity),
    Access(AccessEntity),
    Simple(SimpleEntity),
}

impl Entity {
    /// 公共身份信息
    pub fn info(&self) -> &EntityInfo {
        match self {
            Self::Policy(entity) => entity.info.base(),
            Self::Pip(entity) => entity.info.base(),
            Self::Access(entity) => entity.info.base(),
            Self::Simple(entity) => &entity.info,
        }
    }

    pub fn items(&self) -> &ContentItemSet {
        match self {
            Self::Policy(entity) => &entity.items,
            Self::Pip(entity) => &entity.items,
            Self::Access(entity) => &entity.items,
            Self::Simple(entity) => &entity.items,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.info().entity_type()
    }

    /// 获取某类型的唯一条目
    pub fn get_item(&self, item_type: ContentItemType) -> EntityResult<Option<&ContentItem>> {
        self.items().get_item(item_type)
    }

    /// 按类型过滤条目
    pub fn get_items(&self, item_type: ContentItemType) -> Vec<&ContentItem> {
        self.items().get_items(item_type)
    }

    pub fn as_policy(&self) -> Option<&PolicyEntity> {
        match self {
            Self::Policy(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_pip(&self) -> Option<&PipEntity> {
        match self {
            Self::Pip(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_access(&self) -> Option<&AccessEntity> {
        match self {
            Self::Access(entity) => Some(entity),
            _ => None,
        }
    }
}

impl Versionable for Entity {
    fn id(&self) -> &str {
        self.info().id()
    }

    fn version(&self) -> &str {
        self.info().version()
    }

    fn id_prefix(&self) -> &str {
        self.info().id_prefix()
    }
}

impl From<PolicyEntity> for Entity {
    fn from(entity: PolicyEntity) -> Self {
        Self::Policy(entity)
    }
}

impl From<PipEntity> for Entity {
    fn from(entity: PipEntity) -> Self {
        Self::Pip(entity)
    }
}

impl From<AccessEntity> for Entity {
    fn from(entity: AccessEntity) -> Self {
        Self::Access(entity)
    }
}

impl From<SimpleEntity> for Entity {
    fn from(entity: SimpleEntity) -> Self {
        Self::Simple(entity)
    }
}
