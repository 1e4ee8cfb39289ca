//! 对象存储抽象接口

use crate::item::{ContentItem, ContentItemInfo};
use async_trait::async_trait;
use config_store_common::StoreResult;

/// 条目存储 trait
///
/// 对象存储客户端的最小接口，认证、区域和重试都在实现内部处理。
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// 列出前缀下所有对象的身份信息
    async fn list_item_info(&self, prefix: &str) -> StoreResult<Vec<ContentItemInfo>>;

    /// 获取对象内容
    async fn fetch_content(&self, info: &ContentItemInfo) -> StoreResult<String>;

    /// 获取完整条目
    async fn fetch_item(&self, info: &ContentItemInfo) -> StoreResult<ContentItem> {
        let content = self.fetch_content(info).await?;
        Ok(ContentItem::from_info(info.clone(), content))
    }

    /// 存储名称
    fn name(&self) -> &str;
}
