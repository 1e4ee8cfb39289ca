//! 实体加载与配置解析的端到端测试

mod common;

use common::{init_test_logger, put_policy, seeded_store, POLICY_A, ROOT};
use config_store_abstractions::{AccessGrant, EntityActivationStatus};
use config_store_common::{ConfigStoreError, EntityError, Versionable};
use config_store_impl::{EntityLoader, EntityType, MatchingStrategy};
use serde_json::json;
use std::sync::Arc;
use std::thread;

#[tokio::test]
async fn test_policy_configuration_with_environment_features() -> anyhow::Result<()> {
    init_test_logger();
    let loader = EntityLoader::new(seeded_store(), ROOT).with_environment(Some("QA".to_string()));
    let report = loader.load_all().await?;
    assert!(report.is_clean());
    assert_eq!(report.entities.len(), 3);

    let entity = report
        .entity("us_consumers/lob_a/policy_a/1.0")
        .expect("policy loaded");
    assert_eq!(entity.entity_type(), EntityType::Policy);
    let policy = entity.as_policy().expect("policy entity");
    assert_eq!(policy.entity_activation_status(), EntityActivationStatus::Active);
    assert_eq!(policy.compile_version(), 2);
    assert_eq!(policy.process_items().len(), 1);
    assert_eq!(policy.rule_items().len(), 1);

    let model = policy.config_management_model()?.expect("config present");
    // 精确用例层包含默认值和自身覆盖
    assert_eq!(model.get_value_or_throw("retries", Some("app.a.b.c.checkout"))?, &json!(5));
    assert_eq!(model.get_value_or_throw("timeout", Some("app.a.b.c.checkout"))?, &json!(10));
    // 未定义的用例回退到应用级用例
    assert_eq!(model.get_value_or_throw("timeout", Some("app.a.b.c.refund"))?, &json!(3));
    assert!(!model.is_use_case_defined(Some("app.a.b.c.refund")));
    // 回退到默认值
    assert_eq!(model.get_value_or_throw("timeout", Some("other"))?, &json!(10));
    // 环境特定的 features 覆盖基础 features
    assert_eq!(model.get_value_or_throw("region", Some("app.a.b.c.checkout"))?, &json!("us-west-2"));
    assert_eq!(
        model.get_value("region", None, MatchingStrategy::FeaturesOnly),
        Some(&json!("us-west-2"))
    );
    assert!(model.get_value_or_throw("missing", None).is_err());

    let prod = policy.config_management_model_for_env(Some("prod"))?.expect("config present");
    assert_eq!(prod.get_value_or_throw("region", None)?, &json!("us-east-1"));
    Ok(())
}

#[tokio::test]
async fn test_access_and_pip_entities() -> anyhow::Result<()> {
    init_test_logger();
    let report = EntityLoader::new(seeded_store(), ROOT).load_all().await?;

    let access = report
        .entity("us_consumers/lob_a/policy_a/1/access-control")
        .and_then(|entity| entity.as_access())
        .expect("access entity");
    let policy_access = access.policy_access();
    assert_eq!(policy_access.policy_major_version(), 1);
    assert_eq!(policy_access.access("mobile"), AccessGrant::Allow);
    assert_eq!(policy_access.access("legacy"), AccessGrant::Deny);
    assert_eq!(policy_access.access("unknown"), AccessGrant::Undefined);

    let pip = report
        .entity("pip_profile/routes/profile.xml")
        .and_then(|entity| entity.as_pip())
        .expect("pip entity");
    assert_eq!(pip.route_file()?.content(), "<routes/>");
    Ok(())
}

#[tokio::test]
async fn test_broken_entity_does_not_block_siblings() -> anyhow::Result<()> {
    init_test_logger();
    let store = seeded_store();
    let broken = "policies/us_consumers/lob_a/policy_c/2.0";
    store.put(format!("{broken}/rules/r.dmn"), "<dmn/>")?;
    store.put(format!("{broken}/config/defaults.json"), r#"{"timeout": 1}"#)?;

    let report = EntityLoader::new(store, ROOT).load_all().await?;
    assert_eq!(report.entities.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].entity_id.as_deref(),
        Some("us_consumers/lob_a/policy_c/2.0")
    );
    assert!(matches!(
        report.failures[0].error,
        ConfigStoreError::Entity {
            source: EntityError::InvalidManifest { .. }
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_patch_versions_are_chained() -> anyhow::Result<()> {
    init_test_logger();
    let store = seeded_store();
    put_policy(&store, &format!("{POLICY_A}/1"), "AVAILABLE");
    put_policy(&store, &format!("{POLICY_A}/2"), "INACTIVE");

    let loader = EntityLoader::new(store, ROOT);
    let infos = loader.list_entity_infos().await?;
    let policy_infos: Vec<_> = infos
        .into_iter()
        .filter_map(Result::ok)
        .filter(|info| info.base().entity_type() == EntityType::Policy)
        .collect();
    // 同一标识的补丁版本归并为一个身份，较旧的版本挂在前一个版本链上
    assert_eq!(policy_infos.len(), 1);

    let latest = policy_infos[0].base();
    assert_eq!(latest.patch_version(), 2);
    let prior = latest.prior_version().expect("prior version");
    assert_eq!(prior.patch_version(), 1);
    assert_eq!(prior.prior_version().map(|info| info.patch_version()), Some(0));
    assert_eq!(latest.id(), prior.id());
    Ok(())
}

#[tokio::test]
async fn test_configuration_model_is_memoized_across_threads() -> anyhow::Result<()> {
    init_test_logger();
    let report = EntityLoader::new(seeded_store(), ROOT).load_all().await?;
    let entity = report
        .entity("us_consumers/lob_a/policy_a/1.0")
        .cloned()
        .expect("policy loaded");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let entity = Arc::clone(&entity);
            thread::spawn(move || {
                entity
                    .as_policy()
                    .and_then(|policy| policy.config_management_model().ok().flatten())
            })
        })
        .collect();

    let models: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread").expect("model"))
        .collect();
    assert!(models.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    Ok(())
}
