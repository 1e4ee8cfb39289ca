//! 配置管理内容解析
//!
//! 用 `schema.json` 校验 `defaults.json`、用例文件和 `features*.json`，然后交给合并引擎。
//! schema 的 `$id` 包含 `v2` 时按 v2 格式解析，否则按 v1 格式解析。

use super::model::{ConfigManagementModel, ConfigMap};
use config_store_abstractions::{ContentItem, ContentItemType};
use config_store_common::{file_stem, ConfigManagementError, ConfigManagementResult};
use jsonschema::Validator;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

const REQUIRED_KEY: &str = "required";
const PROPERTIES_KEY: &str = "properties";
const DEFS_KEY: &str = "$defs";
const V2: &str = "v2";
const DEFAULTS_SCHEMA_KEY: &str = "defaults";
const USECASE_SCHEMA_KEY: &str = "usecase";
const FEATURES_SCHEMA_KEY: &str = "features";
const FEATURES_REQUIRED_SCHEMA_KEY: &str = "features-required";
const FEATURES_ENV_PREFIX: &str = "features-";

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("static regex"));

static META_SCHEMA_V1: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "type": "object",
        "required": ["$schema", "type", "required", "additionalProperties", "properties"],
        "additionalProperties": false,
        "properties": {
            "$schema": {
                "type": "string",
                "enum": ["https://json-schema.org/draft/2019-09/schema"]
            },
            "type": {"type": "string", "enum": ["object"]},
            "required": {"type": "array", "items": {"type": "string"}},
            "additionalProperties": {"type": "boolean", "enum": [false]},
            "properties": {
                "type": "object",
                "patternProperties": {".": {"$ref": "#/$defs/config-property"}}
            }
        },
        "$defs": {
            "config-property": {
                "type": "object",
                "required": ["type"],
                "properties": {
                    "type": {"type": "string", "pattern": "(string|boolean|integer|number|array)"},
                    "items": {
                        "type": "object",
                        "required": ["type"],
                        "properties": {
                            "type": {"type": "string", "pattern": "(string|boolean|integer|number)"}
                        }
                    }
                }
            }
        }
    })
});

static META_SCHEMA_V2: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "type": "object",
        "required": ["$id", "$defs"],
        "additionalProperties": false,
        "properties": {
            "$id": {"type": "string", "enum": ["v2"]},
            "$defs": {
                "type": "object",
                "required": ["usecase", "defaults"],
                "properties": {
                    "usecase": {"type": "object", "required": ["type"]},
                    "features": {"type": "object", "required": ["type"]}
                }
            }
        }
    })
});

/// 配置管理模型解析器
pub struct ConfigManagementModelParser;

impl ConfigManagementModelParser {
    /// 解析配置管理内容
    ///
    /// 默认值、schema 和用例都不存在时返回 `Ok(None)`；其余情况必须提供 schema 和默认值。
    pub fn parse(
        location: &str,
        defaults: Option<&str>,
        schema: Option<&str>,
        items: &[&ContentItem],
        feature_items: &[&ContentItem],
        environment: Option<&str>,
    ) -> ConfigManagementResult<Option<ConfigManagementModel>> {
        let use_cases: BTreeMap<String, &str> = items
            .iter()
            .filter(|item| item.item_type() == ContentItemType::ConfigUsecase)
            .map(|item| (file_stem(item.name()).to_string(), item.content()))
            .collect();

        if defaults.is_none() && schema.is_none() && use_cases.is_empty() {
            return Ok(None);
        }

        let Some(schema) = schema else {
            return Err(ConfigManagementError::validation(format!(
                "Unable to parse schema, no valid schema present for entity '{location}'."
            )));
        };
        let schema_node: Value = serde_json::from_str(schema).map_err(|e| {
            ConfigManagementError::validation(format!(
                "Unable to parse schema, invalid format for entity '{location}': {e}"
            ))
        })?;
        let Some(defaults) = defaults else {
            return Err(ConfigManagementError::validation(format!(
                "Invalid configuration for entity '{location}' [schema=true, defaults=false, usecases={}]",
                use_cases.len()
            )));
        };

        let is_v2 = schema_node
            .get("$id")
            .map(|id| id.to_string().to_lowercase().contains(V2))
            .unwrap_or(false);

        let model = if is_v2 {
            debug!("使用 v2 schema 解析配置管理内容: {}", location);
            parse_v2(location, schema_node, defaults, &use_cases, feature_items, environment)?
        } else {
            debug!("使用 v1 schema 解析配置管理内容: {}", location);
            parse_v1(location, schema_node, defaults, &use_cases)?
        };
        Ok(Some(model))
    }
}

fn parse_v1(
    id: &str,
    schema: Value,
    defaults: &str,
    use_cases: &BTreeMap<String, &str>,
) -> ConfigManagementResult<ConfigManagementModel> {
    let meta = compile(&META_SCHEMA_V1, "meta-schema")?;
    validate_value(&meta, &schema, "schema")
        .map_err(|e| schema_error(id, &e.to_string()))?;

    let required: HashSet<&str> = schema
        .get(REQUIRED_KEY)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let properties: HashSet<&str> = schema
        .get(PROPERTIES_KEY)
        .and_then(Value::as_object)
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default();
    if required != properties {
        return Err(schema_error(
            id,
            "All keys under 'properties' key must be in 'required' list and vice versa",
        ));
    }
    for key in &properties {
        validate_key(key, id, "parameter")?;
    }

    let wrap = |e: ConfigManagementError| {
        ConfigManagementError::validation(format!(
            "Exception parsing configuration for id '{id}': {e}"
        ))
    };

    let defaults_schema = compile(&schema, "schema").map_err(wrap)?;
    let defaults_map = parse_config(&defaults_schema, defaults, DEFAULTS_SCHEMA_KEY).map_err(wrap)?;

    let mut use_case_schema = schema;
    if let Some(object) = use_case_schema.as_object_mut() {
        object.remove(REQUIRED_KEY);
    }
    let use_case_schema = compile(&use_case_schema, "schema").map_err(wrap)?;
    let use_case_map = validate_use_cases(&use_case_schema, use_cases, id)?;

    ConfigManagementModel::build(&defaults_map, &use_case_map, None)
}

fn parse_v2(
    id: &str,
    schema: Value,
    defaults: &str,
    use_cases: &BTreeMap<String, &str>,
    feature_items: &[&ContentItem],
    environment: Option<&str>,
) -> ConfigManagementResult<ConfigManagementModel> {
    let wrap = |e: ConfigManagementError| match e {
        ConfigManagementError::Validation { message } => ConfigManagementError::validation(
            format!("Exception parsing configuration for id '{id}': {message}"),
        ),
        other => other,
    };

    let meta = compile(&META_SCHEMA_V2, "meta-schema")?;
    validate_value(&meta, &schema, "schema-v2").map_err(wrap)?;

    let resolved = resolve_references(schema).map_err(wrap)?;
    let sub_schemas = resolved
        .get(DEFS_KEY)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let defaults_schema = compile_sub_schema(&sub_schemas, DEFAULTS_SCHEMA_KEY).map_err(wrap)?;
    let defaults_map = parse_config(&defaults_schema, defaults, DEFAULTS_SCHEMA_KEY).map_err(wrap)?;

    let use_case_schema = compile_sub_schema(&sub_schemas, USECASE_SCHEMA_KEY).map_err(wrap)?;
    let use_case_map = validate_use_cases(&use_case_schema, use_cases, id)?;

    let mut features = ConfigMap::new();
    if sub_schemas.contains_key(FEATURES_REQUIRED_SCHEMA_KEY) || !feature_items.is_empty() {
        let mut feature_configs: BTreeMap<&str, &str> = feature_items
            .iter()
            .map(|item| (file_stem(item.name()), item.content()))
            .collect();

        let required_schema =
            compile_sub_schema(&sub_schemas, FEATURES_REQUIRED_SCHEMA_KEY).map_err(wrap)?;
        let base = feature_configs.remove(FEATURES_SCHEMA_KEY).ok_or_else(|| {
            wrap(ConfigManagementError::validation(
                "Invalid file content 'features-required' does not obey provided schema: features.json is missing",
            ))
        })?;
        features = parse_config(&required_schema, base, FEATURES_REQUIRED_SCHEMA_KEY).map_err(wrap)?;

        let mut env_specific = ConfigMap::new();
        if !feature_configs.is_empty() {
            let env_schema = compile_sub_schema(&sub_schemas, FEATURES_SCHEMA_KEY).map_err(wrap)?;
            let environment = environment
                .map(str::trim)
                .filter(|env| !env.is_empty())
                .map(str::to_lowercase);
            for (name, content) in feature_configs {
                // 不匹配当前环境的文件也必须格式正确
                let parsed = parse_config(&env_schema, content, FEATURES_SCHEMA_KEY).map_err(wrap)?;
                let suffix = name.strip_prefix(FEATURES_ENV_PREFIX).unwrap_or(name);
                if environment.as_deref() == Some(suffix) {
                    debug!("应用环境特定的 features 配置: {} ({})", name, id);
                    env_specific = parsed;
                }
            }
        }
        features.extend(env_specific);
    }

    ConfigManagementModel::build(&defaults_map, &use_case_map, Some(&features))
}

/// 把 `$defs` 下各个子 schema 的 `allOf` 中的 `{"$ref": "<name>"}` 替换为被引用的子 schema
fn resolve_references(mut schema: Value) -> ConfigManagementResult<Value> {
    let Some(defs) = schema.get(DEFS_KEY).and_then(Value::as_object).cloned() else {
        return Ok(schema);
    };
    if let Some(defs_mut) = schema.get_mut(DEFS_KEY).and_then(Value::as_object_mut) {
        for sub_schema in defs_mut.values_mut() {
            let Some(conditions) = sub_schema.as_object_mut() else {
                continue;
            };
            for (key, condition) in conditions.iter_mut() {
                if !key.eq_ignore_ascii_case("allOf") {
                    continue;
                }
                let Some(entries) = condition.as_array_mut() else {
                    continue;
                };
                for entry in entries.iter_mut() {
                    let Some(ref_id) = entry.get("$ref").and_then(Value::as_str) else {
                        continue;
                    };
                    let referenced = defs.get(ref_id).cloned().ok_or_else(|| {
                        ConfigManagementError::validation(format!(
                            "Unable to parse schema, invalid reference '{ref_id}'."
                        ))
                    })?;
                    *entry = referenced;
                }
            }
        }
    }
    Ok(schema)
}

fn compile_sub_schema(sub_schemas: &Map<String, Value>, key: &str) -> ConfigManagementResult<Validator> {
    let schema = sub_schemas.get(key).ok_or_else(|| {
        ConfigManagementError::validation(format!("schema definition '{key}' is missing"))
    })?;
    compile(schema, key)
}

fn compile(schema: &Value, label: &str) -> ConfigManagementResult<Validator> {
    let mut schema = schema.clone();
    // `$id` 是逻辑标识而不是可解析的 URI
    if let Some(object) = schema.as_object_mut() {
        object.remove("$id");
    }
    jsonschema::draft201909::new(&schema).map_err(|e| {
        ConfigManagementError::validation(format!("Unable to compile schema '{label}': {e}"))
    })
}

fn validate_value(validator: &Validator, value: &Value, label: &str) -> ConfigManagementResult<()> {
    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigManagementError::validation(format!(
            "Invalid file content '{label}' does not obey provided schema: {}",
            errors.join(", ")
        )))
    }
}

fn parse_config(validator: &Validator, content: &str, label: &str) -> ConfigManagementResult<ConfigMap> {
    let node: Value = serde_json::from_str(content).map_err(|e| {
        ConfigManagementError::validation(format!(
            "Invalid file content '{label}' does not obey provided schema: {e}"
        ))
    })?;
    validate_value(validator, &node, label)?;
    match node {
        Value::Object(object) => Ok(object.into_iter().collect()),
        other => Err(ConfigManagementError::validation(format!(
            "Invalid file content '{label}': expected a JSON object, found {other}"
        ))),
    }
}

fn validate_use_cases(
    validator: &Validator,
    use_cases: &BTreeMap<String, &str>,
    id: &str,
) -> ConfigManagementResult<HashMap<String, ConfigMap>> {
    let mut parsed = HashMap::with_capacity(use_cases.len());
    for (name, content) in use_cases {
        let layer = parse_config(validator, content, name).map_err(|e| {
            ConfigManagementError::validation(format!(
                "Exception parsing configuration for id '{id}': {e}"
            ))
        })?;
        parsed.insert(name.clone(), layer);
    }
    for name in parsed.keys() {
        validate_key(name, id, "use case")?;
    }
    Ok(parsed)
}

fn validate_key(key: &str, id: &str, kind: &str) -> ConfigManagementResult<()> {
    if KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        warn!("配置管理键包含非法字符: {} ({})", key, id);
        Err(ConfigManagementError::InvalidKey {
            id: id.to_string(),
            kind: kind.to_string(),
            value: key.to_string(),
        })
    }
}

fn schema_error(id: &str, message: &str) -> ConfigManagementError {
    ConfigManagementError::validation(format!("Schema file for id '{id}' malformed. {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCATION: &str = "us_consumers/lob_a/policy_a/1.0";

    const SCHEMA_V1: &str = r#"{
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "type": "object",
        "required": ["timeout", "enabled"],
        "additionalProperties": false,
        "properties": {
            "timeout": {"type": "integer"},
            "enabled": {"type": "boolean"}
        }
    }"#;

    const SCHEMA_V2: &str = r#"{
        "$id": "v2",
        "$defs": {
            "properties": {
                "type": "object",
                "properties": {
                    "timeout": {"type": "integer"},
                    "enabled": {"type": "boolean"}
                }
            },
            "defaults": {
                "type": "object",
                "required": ["timeout", "enabled"],
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

    fn item(name: &str, content: &str) -> ContentItem {
        ContentItem::new(format!("{LOCATION}/config/{name}"), content).unwrap()
    }

    #[test]
    fn test_nothing_present_yields_none() {
        let result = ConfigManagementModelParser::parse(LOCATION, None, None, &[], &[], None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_schema_required_when_content_present() {
        let err = ConfigManagementModelParser::parse(LOCATION, Some("{}"), None, &[], &[], None)
            .unwrap_err();
        assert!(matches!(err, ConfigManagementError::Validation { .. }));
    }

    #[test]
    fn test_v1_parse() {
        let us = item("US.json", r#"{"timeout": 10}"#);
        let model = ConfigManagementModelParser::parse(
            LOCATION,
            Some(r#"{"timeout": 30, "enabled": true}"#),
            Some(SCHEMA_V1),
            &[&us],
            &[],
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(model.get_value_or_throw("timeout", Some("US")).unwrap(), &json!(10));
        assert_eq!(model.get_value_or_throw("enabled", Some("US")).unwrap(), &json!(true));
        assert!(model.features_map().is_none());
    }

    #[test]
    fn test_v1_defaults_must_obey_schema() {
        let err = ConfigManagementModelParser::parse(
            LOCATION,
            Some(r#"{"timeout": "slow", "enabled": true}"#),
            Some(SCHEMA_V1),
            &[],
            &[],
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains(LOCATION));
    }

    #[test]
    fn test_v1_required_must_equal_properties() {
        let schema = r#"{
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "type": "object",
            "required": ["timeout"],
            "additionalProperties": false,
            "properties": {"timeout": {"type": "integer"}, "enabled": {"type": "boolean"}}
        }"#;
        let err = ConfigManagementModelParser::parse(LOCATION, Some("{}"), Some(schema), &[], &[], None)
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_invalid_use_case_name() {
        let bad = item("US$.json", r#"{"timeout": 10}"#);
        let err = ConfigManagementModelParser::parse(
            LOCATION,
            Some(r#"{"timeout": 30, "enabled": true}"#),
            Some(SCHEMA_V1),
            &[&bad],
            &[],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigManagementError::InvalidKey { .. }));
    }

    #[test]
    fn test_v2_with_environment_features() {
        let us = item("US.json", r#"{"timeout": 10}"#);
        let features = item("features.json", r#"{"region": "us-east-1"}"#);
        let features_qa = item("features-qa.json", r#"{"region": "us-west-2"}"#);
        let defaults = r#"{"timeout": 30, "enabled": false}"#;

        let model = ConfigManagementModelParser::parse(
            LOCATION,
            Some(defaults),
            Some(SCHEMA_V2),
            &[&us],
            &[&features, &features_qa],
            Some("QA"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(model.get_value_or_throw("region", Some("US")).unwrap(), &json!("us-west-2"));
        assert_eq!(model.get_value_or_throw("timeout", Some("US")).unwrap(), &json!(10));

        let model = ConfigManagementModelParser::parse(
            LOCATION,
            Some(defaults),
            Some(SCHEMA_V2),
            &[&us],
            &[&features, &features_qa],
            Some("prod"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(model.get_value_or_throw("region", None).unwrap(), &json!("us-east-1"));
    }

    #[test]
    fn test_v2_use_case_cannot_override_features() {
        let schema = r#"{
            "$id": "v2",
            "$defs": {
                "defaults": {"type": "object"},
                "usecase": {"type": "object"},
                "features-required": {"type": "object", "required": ["region"]}
            }
        }"#;
        let us = item("US.json", r#"{"region": "eu-west-1"}"#);
        let features = item("features.json", r#"{"region": "us-east-1"}"#);
        let err = ConfigManagementModelParser::parse(
            LOCATION,
            Some(r#"{"timeout": 30, "enabled": false}"#),
            Some(schema),
            &[&us],
            &[&features],
            None,
        )
        .unwrap_err();
        assert_eq!(err, ConfigManagementError::conflict("region"));
    }

    #[test]
    fn test_v2_missing_required_features() {
        let err = ConfigManagementModelParser::parse(
            LOCATION,
            Some(r#"{"timeout": 30, "enabled": false}"#),
            Some(SCHEMA_V2),
            &[],
            &[],
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("features"));
    }

    #[test]
    fn test_v2_invalid_reference() {
        let schema = SCHEMA_V2.replace(r#"{"$ref": "properties"}"#, r#"{"$ref": "nowhere"}"#);
        let err = ConfigManagementModelParser::parse(
            LOCATION,
            Some(r#"{"timeout": 30, "enabled": false}"#),
            Some(&schema),
            &[],
            &[],
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
