//! JSON 清单解析器与访问控制文档解析器

use config_store_abstractions::{
    EntityActivationStatus, PolicyAccessParser, PolicyManifestParser, PolicyMetadata,
    StoredPolicyAccess,
};
use config_store_common::ManifestProcessingError;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};

/// `policy-metadata.json` 的存储格式，字段可能缺失
#[derive(Debug, Deserialize)]
struct StoredSparsePolicyManifest {
    #[serde(rename = "Status")]
    status: Option<EntityActivationStatus>,
    #[serde(rename = "CompileVersion")]
    compile_version: Option<i32>,
    #[serde(rename = "Type")]
    policy_type: Option<String>,
}

/// JSON 策略清单解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyManifestJsonFileParser;

impl PolicyManifestParser for PolicyManifestJsonFileParser {
    fn parse_policy_metadata(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<Option<PolicyMetadata>, ManifestProcessingError> {
        let stored: StoredSparsePolicyManifest = serde_json::from_str(content)
            .map_err(|e| ManifestProcessingError::new(file_name, e.to_string()))?;

        let Some(status) = stored.status else {
            return Ok(None);
        };
        let mut metadata = PolicyMetadata::new(status);
        if let Some(policy_type) = stored.policy_type.filter(|t| !t.trim().is_empty()) {
            metadata = metadata.with_policy_type(policy_type);
        }
        if let Some(compile_version) = stored.compile_version {
            metadata = metadata.with_compile_version(compile_version);
        }
        Ok(Some(metadata))
    }
}

static ACCESS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "type": "object",
        "required": ["schemaVersion", "policyNamespace", "policyMajorVersion", "clients"],
        "properties": {
            "schemaVersion": {"type": "string"},
            "policyNamespace": {"type": "string", "minLength": 1},
            "policyMajorVersion": {"type": "integer", "minimum": 0},
            "clients": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "effect"],
                    "properties": {
                        "id": {"type": "string", "minLength": 1},
                        "effect": {"type": "string", "enum": ["ALLOW", "DENY"]}
                    }
                }
            }
        }
    })
});

/// 访问控制文档解析器，先做 schema 校验再反序列化
pub struct StoredPolicyAccessParser {
    validator: Validator,
}

impl StoredPolicyAccessParser {
    /// 创建解析器
    pub fn new() -> Result<Self, String> {
        let validator = jsonschema::draft201909::new(&ACCESS_SCHEMA)
            .map_err(|e| format!("access control schema failed to compile: {e}"))?;
        Ok(Self { validator })
    }
}

impl PolicyAccessParser for StoredPolicyAccessParser {
    fn parse_policy_access(&self, content: &str) -> Result<StoredPolicyAccess, String> {
        let node: Value = serde_json::from_str(content).map_err(|e| invalid_content(&e.to_string()))?;
        let errors: Vec<String> = self
            .validator
            .iter_errors(&node)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(invalid_content(&errors.join(", ")));
        }
        serde_json::from_value(node).map_err(|e| invalid_content(&e.to_string()))
    }
}

fn invalid_content(cause: &str) -> String {
    format!(
        "Failed to parse policy access document. Invalid file content does not obey abac schema: {cause}"
    )
}
