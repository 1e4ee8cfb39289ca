//! 字符串与内容摘要工具

use crate::errors::EntityError;
use sha2::{Digest, Sha256};

/// 要求字符串非空且不全是空白
pub fn require_not_blank(value: &str) -> Result<&str, EntityError> {
    if value.trim().is_empty() {
        Err(EntityError::invalid_info(format!(
            "empty string provided=[{}]",
            value
        )))
    } else {
        Ok(value)
    }
}

/// 计算内容摘要（小写十六进制 SHA-256）
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// 取对象名的文件主干部分，例如 `a/b/config/US.json` -> `US`
pub fn file_stem(name: &str) -> &str {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    file_name.strip_suffix(".json").unwrap_or(file_name)
}
