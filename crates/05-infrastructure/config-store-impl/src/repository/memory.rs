//! 内存条目存储

use async_trait::async_trait;
use config_store_abstractions::{ContentItem, ContentItemInfo, ItemStore};
use config_store_common::{EntityResult, StoreError, StoreResult};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// 基于 [`DashMap`] 的条目存储，用于本地运行和测试
#[derive(Debug)]
pub struct InMemoryItemStore {
    name: String,
    items: DashMap<String, ContentItem>,
    available: AtomicBool,
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl InMemoryItemStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// 写入条目，同名条目被替换
    pub fn put_item(&self, item: ContentItem) {
        self.items.insert(item.name().to_string(), item);
    }

    /// 写入内容，标记取内容的摘要
    pub fn put(&self, name: impl Into<String>, content: impl Into<String>) -> EntityResult<()> {
        self.put_item(ContentItem::new(name, content)?);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Option<ContentItem> {
        self.items.remove(name).map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 模拟存储不可用
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                message: format!("store '{}' is unavailable", self.name),
            })
        }
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn list_item_info(&self, prefix: &str) -> StoreResult<Vec<ContentItemInfo>> {
        self.ensure_available()?;
        let mut infos: Vec<ContentItemInfo> = self
            .items
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.value().info().clone())
            .collect();
        infos.sort();
        Ok(infos)
    }

    async fn fetch_content(&self, info: &ContentItemInfo) -> StoreResult<String> {
        self.ensure_available()?;
        self.items
            .get(info.name())
            .filter(|item| item.tag() == info.tag())
            .map(|item| item.content().to_string())
            .ok_or_else(|| StoreError::ItemNotFound {
                name: info.name().to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
