//! # Config Store Abstractions
//!
//! 配置存储抽象层，定义各组件共享的数据模型和协作接口。
//!
//! ## 核心接口
//!
//! - [`ItemStore`] - 对象存储接口
//! - [`PolicyManifestParser`] / [`PolicyAccessParser`] - 内容解析接口
//! - [`ScanHandler`] - 扫描处理接口
//! - [`ConfigStoreEventListener`] / [`ConfigStoreEventPublisher`] - 事件接口

pub mod events;
pub mod item;
pub mod metadata;
pub mod parser;
pub mod polling;
pub mod scan;
pub mod store;

pub use events::*;
pub use item::*;
pub use metadata::*;
pub use parser::*;
pub use polling::*;
pub use scan::*;
pub use store::*;
