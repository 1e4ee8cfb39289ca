//! 实体加载器
//!
//! 通过 [`ItemStore`] 列出条目、归组、取回内容并构建实体。单个实体失败只记录在加载报告中，不影响其他实体。

use super::factory::{group_entity_infos, EntityInfoFactory};
use crate::model::{AccessEntity, Entity, PipEntity, PolicyEntity, SimpleEntity, TypedEntityInfo};
use config_store_abstractions::{ContentItemSet, ItemStore};
use config_store_common::{ConfigStoreError, ConfigStoreResult, EntityResult, StoreResult, Versionable};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 构建失败的实体
#[derive(Debug, Clone)]
pub struct EntityLoadFailure {
    /// 实体标识，归组阶段失败时为空
    pub entity_id: Option<String>,
    pub error: ConfigStoreError,
}

/// 一次加载的结果
#[derive(Debug, Default, Clone)]
pub struct EntityLoadReport {
    pub entities: Vec<Arc<Entity>>,
    pub failures: Vec<EntityLoadFailure>,
}

impl EntityLoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 按标识查找实体
    pub fn entity(&self, id: &str) -> Option<&Arc<Entity>> {
        self.entities.iter().find(|entity| entity.id() == id)
    }
}

/// 实体加载器
pub struct EntityLoader {
    store: Arc<dyn ItemStore>,
    root_prefix: String,
    factories: Vec<EntityInfoFactory>,
    environment: Option<String>,
}

impl EntityLoader {
    /// 使用所有内置工厂
    pub fn new(store: Arc<dyn ItemStore>, root_prefix: impl Into<String>) -> Self {
        Self {
            store,
            root_prefix: root_prefix.into(),
            factories: EntityInfoFactory::all(),
            environment: None,
        }
    }

    /// 只加载指定工厂对应的实体类型
    pub fn with_factories(mut self, factories: Vec<EntityInfoFactory>) -> Self {
        self.factories = factories;
        self
    }

    /// 策略实体的配置模型使用的环境
    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// 列出并归组实体身份
    pub async fn list_entity_infos(
        &self,
    ) -> StoreResult<Vec<EntityResult<TypedEntityInfo>>> {
        let item_infos = self.store.list_item_info(&self.root_prefix).await?;
        debug!(
            "存储 {} 在 '{}' 下列出 {} 个条目",
            self.store.name(),
            self.root_prefix,
            item_infos.len()
        );
        Ok(group_entity_infos(&self.factories, item_infos))
    }

    /// 取回实体的全部条目并构建实体
    pub async fn load_entity(&self, info: &TypedEntityInfo) -> ConfigStoreResult<Entity> {
        let base = info.base();
        let items = try_join_all(
            base.item_info()
                .iter()
                .map(|item_info| self.store.fetch_item(item_info)),
        )
        .await?;
        let items = ContentItemSet::from_items(items)?;

        let entity = match info.clone() {
            TypedEntityInfo::Policy(policy_info) => Entity::from(
                PolicyEntity::new(policy_info, items)?.with_environment(self.environment.clone()),
            ),
            TypedEntityInfo::Pip(pip_info) => Entity::from(PipEntity::new(pip_info, items)),
            TypedEntityInfo::Access(access_info) => {
                Entity::from(AccessEntity::new(access_info, items)?)
            }
            TypedEntityInfo::Simple(simple_info) => Entity::from(SimpleEntity::new(simple_info, items)),
        };
        debug!("实体已构建: {}", entity.info());
        Ok(entity)
    }

    /// 加载根前缀下的全部实体
    ///
    /// 只有列出条目失败时返回错误，单个实体的失败收集在报告中。
    pub async fn load_all(&self) -> StoreResult<EntityLoadReport> {
        let mut report = EntityLoadReport::default();
        for info in self.list_entity_infos().await? {
            let info = match info {
                Ok(info) => info,
                Err(e) => {
                    warn!("实体身份无效: {}", e);
                    report.failures.push(EntityLoadFailure {
                        entity_id: None,
                        error: e.into(),
                    });
                    continue;
                }
            };
            match self.load_entity(&info).await {
                Ok(entity) => report.entities.push(Arc::new(entity)),
                Err(e) => {
                    warn!("实体构建失败 [{}]: {}", info.id(), e);
                    report.failures.push(EntityLoadFailure {
                        entity_id: Some(info.id().to_string()),
                        error: e,
                    });
                }
            }
        }
        info!(
            "从 '{}' 加载实体完成: 成功 {} 个, 失败 {} 个",
            self.root_prefix,
            report.entities.len(),
            report.failures.len()
        );
        Ok(report)
    }
}
