//! # Config Store Implementation
//!
//! 策略配置存储的具体实现：配置合并与解析、实体模型、实体加载、轮询调度与扫描执行。
//!
//! ## 主要组件
//!
//! - [`ConfigManagementModel`] - 分层配置模型与匹配策略
//! - [`Entity`] - 策略、PIP、访问控制实体
//! - [`EntityLoader`] - 从存储加载实体
//! - [`SimpleScanRequester`] - 轮询扫描请求调度
//! - [`ScanExecutor`] - 扫描执行与状态跟踪
//! - [`ConfigStoreEventHandler`] - 事件分发

pub mod configmanagement;
pub mod event_handler;
pub mod logging;
pub mod model;
pub mod parsing;
pub mod polling;
pub mod repository;
pub mod scanner;
pub mod settings;

pub use configmanagement::*;
pub use event_handler::*;
pub use logging::*;
pub use model::*;
pub use parsing::*;
pub use polling::*;
pub use repository::*;
pub use scanner::*;
pub use settings::*;
