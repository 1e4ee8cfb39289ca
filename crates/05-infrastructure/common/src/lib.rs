//! # Config Store Common
//!
//! 这个 crate 提供了策略配置存储各层共享的错误类型、版本接口和工具函数。
//!
//! ## 核心组件
//!
//! - [`ConfigStoreError`] - 聚合错误类型
//! - [`Versionable`] - 可版本化对象接口
//! - [`LogicalVersion`] - 逻辑版本接口

pub mod errors;
pub mod util;
pub mod versioning;

pub use errors::*;
pub use util::*;
pub use versioning::*;
