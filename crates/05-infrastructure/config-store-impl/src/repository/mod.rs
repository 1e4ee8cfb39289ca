//! 存储访问：实体身份归组、实体加载与内存存储

pub mod factory;
pub mod loader;
pub mod memory;

pub use factory::{group_entity_infos, EntityBuilder, EntityInfoFactory};
pub use loader::{EntityLoadFailure, EntityLoadReport, EntityLoader};
pub use memory::InMemoryItemStore;
