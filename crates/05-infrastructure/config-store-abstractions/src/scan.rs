//! 扫描请求与扫描处理抽象接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config_store_common::ConfigStoreResult;
use std::fmt;

/// 扫描类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    /// 启动或强制加载
    Load,
    /// 定时轮询
    Poll,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("LOAD"),
            Self::Poll => f.write_str("POLL"),
        }
    }
}

/// 扫描状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    /// 空闲
    Idle,
    /// 已排期
    Scheduled,
    /// 扫描中
    Scanning,
    /// 完成
    Completed,
    /// 失败
    Failed,
}

impl ScanState {
    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// 扫描请求
///
/// `start_actual` 在创建时记录，与 `start_scheduled` 的差值即调度延迟。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    start_scheduled: DateTime<Utc>,
    scan_type: ScanType,
    start_actual: DateTime<Utc>,
}

impl ScanRequest {
    /// 以当前时间作为实际开始时间创建
    pub fn new(start_scheduled: DateTime<Utc>, scan_type: ScanType) -> Self {
        Self::with_start_actual(start_scheduled, scan_type, Utc::now())
    }

    /// 指定实际开始时间创建
    pub fn with_start_actual(
        start_scheduled: DateTime<Utc>,
        scan_type: ScanType,
        start_actual: DateTime<Utc>,
    ) -> Self {
        Self {
            start_scheduled,
            scan_type,
            start_actual,
        }
    }

    pub fn start_scheduled(&self) -> DateTime<Utc> {
        self.start_scheduled
    }

    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    pub fn start_actual(&self) -> DateTime<Utc> {
        self.start_actual
    }

    /// 调度延迟（毫秒）
    pub fn scheduling_lag_millis(&self) -> i64 {
        (self.start_actual - self.start_scheduled).num_milliseconds()
    }
}

impl fmt::Display for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScanRequest(type={}, startScheduled={}, startActual={})",
            self.scan_type,
            self.start_scheduled.to_rfc3339(),
            self.start_actual.to_rfc3339()
        )
    }
}

/// 扫描处理器 trait
///
/// 负责一次扫描的实际工作（列举、比对、加载实体），由扫描执行器驱动。
#[async_trait]
pub trait ScanHandler: Send + Sync {
    /// 执行一次扫描
    async fn scan(&self, request: &ScanRequest) -> ConfigStoreResult<()>;

    /// 处理器名称
    fn name(&self) -> &str;
}
