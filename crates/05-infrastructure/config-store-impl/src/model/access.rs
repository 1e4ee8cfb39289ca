//! 策略访问控制

use super::entity_info::AccessInfo;
use config_store_abstractions::{AccessGrant, StoredPolicyAccess};
use config_store_common::{EntityError, EntityResult, LogicalVersion, Versionable};
use std::collections::HashMap;

/// 策略访问控制：客户端到授权结果的映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAccess {
    access_id: String,
    policy_short_name: String,
    policy_major_version: u32,
    client_grants: HashMap<String, AccessGrant>,
}

impl PolicyAccess {
    pub fn new(
        access_id: impl Into<String>,
        policy_short_name: impl Into<String>,
        policy_major_version: u32,
        clients: impl IntoIterator<Item = (String, AccessGrant)>,
    ) -> Self {
        Self {
            access_id: access_id.into(),
            policy_short_name: policy_short_name.into(),
            policy_major_version,
            client_grants: clients.into_iter().collect(),
        }
    }

    /// 由实体身份和存储文档创建
    ///
    /// 实体标识必须以文档的命名空间开头，主版本号必须一致。
    pub fn from_stored(info: &AccessInfo, stored: &StoredPolicyAccess) -> EntityResult<Self> {
        if !info.id().starts_with(&stored.policy_namespace)
            || info.major_version() != stored.policy_major_version
        {
            return Err(EntityError::access_parsing(format!(
                "Invalid/mismatched fields in policy access document [entity:={}, access:=namespace {}, major version {}]",
                info.base(),
                stored.policy_namespace,
                stored.policy_major_version
            )));
        }
        Ok(Self::new(
            info.id(),
            info.policy_short_name(),
            info.policy_major_version(),
            stored
                .clients
                .iter()
                .map(|client| (client.id.clone(), client.effect)),
        ))
    }

    pub fn access_id(&self) -> &str {
        &self.access_id
    }

    pub fn policy_short_name(&self) -> &str {
        &self.policy_short_name
    }

    pub fn policy_major_version(&self) -> u32 {
        self.policy_major_version
    }

    /// 客户端的授权结果，未声明的客户端为 [`AccessGrant::Undefined`]
    pub fn access(&self, client_id: &str) -> AccessGrant {
        self.client_grants
            .get(client_id)
            .copied()
            .unwrap_or(AccessGrant::Undefined)
    }
}
