//! 配置管理：合并引擎、查询模型、匹配策略与 schema 校验

pub mod model;
pub mod parser;
pub mod strategy;

pub use model::{ConfigManagementModel, ConfigMap};
pub use parser::ConfigManagementModelParser;
pub use strategy::{app_level_use_case, MatchingStrategy};
