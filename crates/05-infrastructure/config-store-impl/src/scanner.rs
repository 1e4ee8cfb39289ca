//! 扫描执行器
//!
//! 通过 [`ScanHandler`] 执行扫描请求并跟踪状态，成功时发布 [`ConfigStoreScanCompleted`]。

use crate::polling::ScanRequests;
use config_store_abstractions::{
    Clock, ConfigStoreEventPublisher, ConfigStoreScanCompleted, ScanHandler, ScanRequest,
    ScanState, SystemClock,
};
use config_store_common::ConfigStoreResult;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 最近一次扫描尝试
#[derive(Debug, Clone, Copy)]
struct LatestAttempt {
    attempt: u64,
    state: ScanState,
}

/// 扫描执行器
pub struct ScanExecutor {
    handler: Arc<dyn ScanHandler>,
    publisher: Arc<dyn ConfigStoreEventPublisher>,
    clock: Arc<dyn Clock>,
    next_attempt: AtomicU64,
    in_flight: AtomicUsize,
    latest: Mutex<LatestAttempt>,
    last_completed: Mutex<Option<ConfigStoreScanCompleted>>,
}

impl ScanExecutor {
    pub fn new(
        handler: Arc<dyn ScanHandler>,
        publisher: Arc<dyn ConfigStoreEventPublisher>,
    ) -> Self {
        Self {
            handler,
            publisher,
            clock: Arc::new(SystemClock),
            next_attempt: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            latest: Mutex::new(LatestAttempt {
                attempt: 0,
                state: ScanState::Idle,
            }),
            last_completed: Mutex::new(None),
        }
    }

    /// 指定时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 最近一次尝试的状态
    pub fn state(&self) -> ScanState {
        self.latest.lock().state
    }

    /// 正在执行的扫描数量
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// 最近一次成功扫描的完成事件
    pub fn last_completed(&self) -> Option<ConfigStoreScanCompleted> {
        self.last_completed.lock().clone()
    }

    /// 只有不早于当前记录的尝试才能更新状态
    fn transition(&self, attempt: u64, state: ScanState) {
        let mut latest = self.latest.lock();
        if attempt >= latest.attempt {
            *latest = LatestAttempt { attempt, state };
        }
    }

    /// 执行一次扫描
    pub async fn execute(&self, request: ScanRequest) -> ConfigStoreResult<ConfigStoreScanCompleted> {
        let attempt = self.next_attempt.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(attempt, ScanState::Scheduled);
        debug!("扫描已排期 [#{}]: {}", attempt, request);

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.transition(attempt, ScanState::Scanning);
        info!("开始扫描 [#{}] type={}, 处理器={}", attempt, request.scan_type(), self.handler.name());
        let result = self.handler.scan(&request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(()) => {
                let completed = ConfigStoreScanCompleted::new(request, self.clock.now());
                self.transition(attempt, ScanState::Completed);
                info!(
                    "扫描完成 [#{}]: 耗时 {}ms, 调度延迟 {}ms",
                    attempt,
                    completed.duration_millis(),
                    completed.scheduling_lag_millis()
                );
                *self.last_completed.lock() = Some(completed.clone());
                self.publisher.publish(completed.clone().into());
                Ok(completed)
            }
            Err(e) => {
                self.transition(attempt, ScanState::Failed);
                error!("扫描失败 [#{}] {}: {}", attempt, request, e);
                Err(e)
            }
        }
    }

    /// 消费请求流，每个请求在独立任务中执行，允许重叠
    pub fn run(self: Arc<Self>, mut requests: ScanRequests) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = requests.next().await {
                let executor = self.clone();
                tokio::spawn(async move {
                    // 失败已在 execute 中记录
                    let _ = executor.execute(request).await;
                });
            }
            debug!("扫描请求流已结束");
        })
    }
}
