//! 内容解析器抽象接口
//!
//! 原始内容到类型化值的转换由外部解析器负责，这里只定义接口。

use crate::metadata::{PolicyMetadata, StoredPolicyAccess};
use config_store_common::ManifestProcessingError;

/// 策略清单解析器 trait
pub trait PolicyManifestParser: Send + Sync {
    /// 解析 `policy-metadata.json`
    ///
    /// 内容合法但缺少状态时返回 `Ok(None)`。
    fn parse_policy_metadata(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<Option<PolicyMetadata>, ManifestProcessingError>;
}

/// 访问控制文档解析器 trait
pub trait PolicyAccessParser: Send + Sync {
    /// 解析 `policy-access.json`
    fn parse_policy_access(&self, content: &str) -> Result<StoredPolicyAccess, String>;
}
