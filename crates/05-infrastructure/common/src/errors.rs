//! 错误类型定义

use thiserror::Error;

/// 配置管理错误类型
///
/// 需要 `Clone`：策略实体会缓存一次构建结果（包括失败），并把同一个错误交给每个调用方。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigManagementError {
    #[error("Policy Level config cannot be present in usecase or defaults: {key}")]
    Conflict { key: String },

    #[error("config management property not found: {key} (parameter must be present in the set of default properties)")]
    NotFound { key: String },

    #[error("配置管理内容校验失败: {message}")]
    Validation { message: String },

    #[error("Exception parsing configuration for id '{id}'. A config management {kind} contains invalid characters: '{value}'")]
    InvalidKey {
        id: String,
        kind: String,
        value: String,
    },
}

impl ConfigManagementError {
    /// 创建冲突错误
    pub fn conflict(key: impl Into<String>) -> Self {
        Self::Conflict { key: key.into() }
    }

    /// 创建校验错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// 外部清单解析器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("清单处理失败: {file_name}: {message}")]
pub struct ManifestProcessingError {
    /// 出错的文件
    pub file_name: String,
    /// 错误描述
    pub message: String,
}

impl ManifestProcessingError {
    /// 创建清单处理错误
    pub fn new(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            message: message.into(),
        }
    }
}

/// 实体构建错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// 清单解析器本身失败时 `source` 保留原始错误
    #[error("策略元数据无效: {entity}, 原因: {message}")]
    InvalidManifest {
        entity: String,
        message: String,
        #[source]
        source: Option<ManifestProcessingError>,
    },

    #[error("Error creating policy access entity: {message}")]
    AccessParsing { message: String },

    #[error("条目数量不符合约定: 类型 {item_type}, 期望 {expected}, 实际 {actual}")]
    Cardinality {
        item_type: String,
        expected: String,
        actual: usize,
    },

    #[error("实体信息无效: {message}")]
    InvalidEntityInfo { message: String },
}

impl EntityError {
    /// 创建访问控制解析错误
    pub fn access_parsing(message: impl Into<String>) -> Self {
        Self::AccessParsing {
            message: message.into(),
        }
    }

    /// 创建实体信息错误
    pub fn invalid_info(message: impl Into<String>) -> Self {
        Self::InvalidEntityInfo {
            message: message.into(),
        }
    }
}

/// 存储客户端错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("配置存储不可用: {message}")]
    Unavailable { message: String },

    #[error("存储对象不存在: {name}")]
    ItemNotFound { name: String },
}

/// 轮询配置错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollingError {
    #[error("Specified duration '{interval}' must be a factor of 1 day in milliseconds")]
    InvalidInterval { interval: String },

    #[error("Invalid Poll Configuration, {message}")]
    MissingProperty { message: String },

    #[error("轮询属性解析失败: '{value}', 原因: {message}")]
    Parse { value: String, message: String },
}

/// 配置存储错误类型
#[derive(Error, Debug, Clone)]
pub enum ConfigStoreError {
    #[error("配置管理错误: {source}")]
    ConfigManagement {
        #[from]
        source: ConfigManagementError,
    },

    #[error("实体错误: {source}")]
    Entity {
        #[from]
        source: EntityError,
    },

    #[error("存储错误: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("清单错误: {source}")]
    Manifest {
        #[from]
        source: ManifestProcessingError,
    },

    #[error("轮询错误: {source}")]
    Polling {
        #[from]
        source: PollingError,
    },

    #[error("配置加载失败: {message}")]
    Settings { message: String },

    #[error("日志初始化失败: {message}")]
    Logging { message: String },

    #[error("扫描失败: {message}")]
    Scan { message: String },

    #[error("事件监听器不存在: {name}")]
    ListenerNotFound { name: String },
}

/// 结果类型别名
pub type ConfigManagementResult<T> = Result<T, ConfigManagementError>;
pub type EntityResult<T> = Result<T, EntityError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type PollingResult<T> = Result<T, PollingError>;
pub type ConfigStoreResult<T> = Result<T, ConfigStoreError>;
