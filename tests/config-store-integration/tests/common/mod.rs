//! 集成测试共用的初始化与数据准备

#![allow(dead_code)]

use config_store_impl::InMemoryItemStore;
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// 初始化测试日志系统（只初始化一次）
pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const ROOT: &str = "policies/";
pub const POLICY_A: &str = "policies/us_consumers/lob_a/policy_a/1.0";

pub const SCHEMA_V2: &str = r#"{
    "$id": "v2",
    "$defs": {
        "properties": {
            "type": "object",
            "properties": {
                "timeout": {"type": "integer"},
                "retries": {"type": "integer"},
                "enabled": {"type": "boolean"}
            }
        },
        "defaults": {
            "type": "object",
            "required": ["timeout", "retries", "enabled"],
            "allOf": [{"$ref": "properties"}]
        },
        "usecase": {
            "type": "object",
            "allOf": [{"$ref": "properties"}]
        },
        "features": {
            "type": "object",
            "properties": {"region": {"type": "string"}},
            "additionalProperties": false
        },
        "features-required": {
            "type": "object",
            "required": ["region"],
            "properties": {"region": {"type": "string"}},
            "additionalProperties": false
        }
    }
}"#;

/// 写入一个完整的策略
pub fn put_policy(store: &InMemoryItemStore, location: &str, status: &str) {
    let put = |name: &str, content: &str| {
        store
            .put(format!("{location}/{name}"), content)
            .expect("seed item");
    };
    put("policy-metadata.json", &format!(r#"{{"Status": "{status}", "CompileVersion": 2}}"#));
    put("config/schema.json", SCHEMA_V2);
    put(
        "config/defaults.json",
        r#"{"timeout": 10, "retries": 1, "enabled": true}"#,
    );
    put("config/app.a.b.c.json", r#"{"timeout": 3}"#);
    put("config/app.a.b.c.checkout.json", r#"{"retries": 5}"#);
    put("config/features.json", r#"{"region": "us-east-1"}"#);
    put("config/features-qa.json", r#"{"region": "us-west-2"}"#);
    put("process/main.xml", "<process/>");
    put("rules/eligibility.dmn", "<dmn/>");
}

/// 带有多个实体的存储
pub fn seeded_store() -> Arc<InMemoryItemStore> {
    let store = Arc::new(InMemoryItemStore::new("integration"));
    put_policy(&store, POLICY_A, "ACTIVE");
    store
        .put(
            "policies/us_consumers/lob_a/policy_a/1/access-control/3/policy-access.json",
            r#"{"schemaVersion": "1", "policyNamespace": "us_consumers/lob_a/policy_a",
                "policyMajorVersion": 1,
                "clients": [{"id": "mobile", "effect": "ALLOW"}, {"id": "legacy", "effect": "DENY"}]}"#,
        )
        .expect("seed item");
    store
        .put("policies/pip_profile/routes/profile.xml", "<routes/>")
        .expect("seed item");
    store
}
