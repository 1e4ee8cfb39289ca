//! 实体模型：身份信息、实体变体与访问控制

pub mod access;
pub mod entity;
pub mod entity_info;

pub use access::PolicyAccess;
pub use entity::{AccessEntity, Entity, PipEntity, PolicyEntity, SimpleEntity};
pub use entity_info::{
    AccessInfo, EntityInfo, EntityType, PipInfo, PolicyDefinition, PolicyInfo, TypedEntityInfo,
    DEFAULT_VERSION_NUMBER,
};
