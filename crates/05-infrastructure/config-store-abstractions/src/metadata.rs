//! 策略元数据与访问控制文档定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 默认编译版本
pub const DEFAULT_COMPILE_VERSION: i32 = 1;

/// 默认策略类型
pub const DEFAULT_POLICY_TYPE: &str = "ORCHESTRATION_POLICY";

/// 实体激活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityActivationStatus {
    /// 已激活
    Active,
    /// 可用但未激活
    Available,
    /// 未激活
    Inactive,
    /// 已禁用
    Disabled,
}

impl FromStr for EntityActivationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "AVAILABLE" => Ok(Self::Available),
            "INACTIVE" => Ok(Self::Inactive),
            "DISABLED" => Ok(Self::Disabled),
            other => Err(format!("unknown activation status: {other}")),
        }
    }
}

impl fmt::Display for EntityActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "ACTIVE",
            Self::Available => "AVAILABLE",
            Self::Inactive => "INACTIVE",
            Self::Disabled => "DISABLED",
        };
        f.write_str(label)
    }
}

/// 策略元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyMetadata {
    status: EntityActivationStatus,
    compile_version: i32,
    policy_type: String,
}

impl PolicyMetadata {
    /// 使用默认编译版本和类型创建
    pub fn new(status: EntityActivationStatus) -> Self {
        Self {
            status,
            compile_version: DEFAULT_COMPILE_VERSION,
            policy_type: DEFAULT_POLICY_TYPE.to_string(),
        }
    }

    /// 设置编译版本
    pub fn with_compile_version(mut self, compile_version: i32) -> Self {
        self.compile_version = compile_version;
        self
    }

    /// 设置策略类型
    pub fn with_policy_type(mut self, policy_type: impl Into<String>) -> Self {
        self.policy_type = policy_type.into();
        self
    }

    pub fn status(&self) -> EntityActivationStatus {
        self.status
    }

    pub fn compile_version(&self) -> i32 {
        self.compile_version
    }

    pub fn policy_type(&self) -> &str {
        &self.policy_type
    }
}

/// 访问授权结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessGrant {
    /// 允许
    Allow,
    /// 拒绝
    Deny,
    /// 未声明
    Undefined,
}

/// 访问控制文档中的客户端条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredClient {
    pub id: String,
    pub effect: AccessGrant,
}

/// 存储中的访问控制文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPolicyAccess {
    pub schema_version: String,
    pub policy_namespace: String,
    pub policy_major_version: u32,
    #[serde(default)]
    pub clients: Vec<StoredClient>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "active".parse::<EntityActivationStatus>().unwrap(),
            EntityActivationStatus::Active
        );
        assert_eq!(
            " INACTIVE ".parse::<EntityActivationStatus>().unwrap(),
            EntityActivationStatus::Inactive
        );
        assert!("BROKEN".parse::<EntityActivationStatus>().is_err());
    }

    #[test]
    fn test_metadata_defaults() {
        let metadata = PolicyMetadata::new(EntityActivationStatus::Active);
        assert_eq!(metadata.compile_version(), 1);
        assert_eq!(metadata.policy_type(), "ORCHESTRATION_POLICY");

        let metadata = metadata.with_compile_version(2).with_policy_type("DECISION");
        assert_eq!(metadata.compile_version(), 2);
        assert_eq!(metadata.policy_type(), "DECISION");
    }

    #[test]
    fn test_stored_access_deserialize() {
        let doc: StoredPolicyAccess = serde_json::from_str(
            r#"{
                "schemaVersion": "1.0",
                "policyNamespace": "us_consumers/lob_a",
                "policyMajorVersion": 1,
                "clients": [{"id": "client-a", "effect": "ALLOW"}]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.policy_major_version, 1);
        assert_eq!(doc.clients[0].effect, AccessGrant::Allow);
    }
}
