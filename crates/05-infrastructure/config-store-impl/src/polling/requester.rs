//! 扫描请求调度
//!
//! 按当前生效的轮询配置定时产生 POLL 请求，新的配置替换正在运行的调度，无效的配置只产生错误事件。

use super::util::first_poll_time;
use chrono::{DateTime, TimeDelta, Utc};
use config_store_abstractions::{
    Clock, ConfigStoreEventPublisher, PollingConfiguration, PollingConfigurationApplied,
    PollingConfigurationErrorOccurred, ScanRequest, ScanType, SystemClock,
};
use config_store_common::{ConfigStoreError, ConfigStoreResult};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const REQUEST_BUFFER: usize = 16;

/// 以 tokio 时钟推进的墙钟时间
///
/// 运行时暂停时间（测试中的 `start_paused`）时随虚拟时间一起前进。
#[derive(Debug, Clone, Copy)]
pub struct RuntimeClock {
    wall_origin: DateTime<Utc>,
    origin: Instant,
}

impl RuntimeClock {
    /// 从当前时刻开始
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// 从指定墙钟时间开始
    pub fn starting_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            wall_origin,
            origin: Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).unwrap_or_default();
        self.wall_origin + elapsed
    }
}

/// 正在运行的调度
struct Schedule {
    configuration: PollingConfiguration,
    next_fire: DateTime<Utc>,
    deadline: Instant,
}

impl Schedule {
    /// 推进到网格上严格晚于 `now` 的下一个时刻，错过的时刻直接跳过
    fn advance(&mut self, now: DateTime<Utc>) {
        let interval = self.configuration.interval();
        let reference = now.max(self.next_fire);
        self.next_fire = first_poll_time(reference, self.configuration.time_of_day_utc(), interval)
            .unwrap_or_else(|_| reference + TimeDelta::from_std(interval).unwrap_or_default());
        self.deadline = Instant::now() + (self.next_fire - now).to_std().unwrap_or_default();
    }
}

/// 简单扫描请求器
pub struct SimpleScanRequester {
    default_configuration: Option<PollingConfiguration>,
    publisher: Arc<dyn ConfigStoreEventPublisher>,
    clock: Arc<dyn Clock>,
}

impl SimpleScanRequester {
    /// `default_configuration` 在没有外部配置时使用
    pub fn new(
        default_configuration: Option<PollingConfiguration>,
        publisher: Arc<dyn ConfigStoreEventPublisher>,
    ) -> Self {
        Self {
            default_configuration,
            publisher,
            clock: Arc::new(SystemClock),
        }
    }

    /// 指定时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 只使用默认配置启动
    pub fn start(self) -> ScanRequests {
        let (_sender, receiver) = watch::channel(None);
        self.start_with_updates(receiver)
    }

    /// 启动调度，`updates` 中的每个新配置替换当前调度
    ///
    /// 调度任务运行在默认配置指定的运行时上，未指定时使用当前运行时。
    pub fn start_with_updates(
        self,
        updates: watch::Receiver<Option<PollingConfiguration>>,
    ) -> ScanRequests {
        let (sender, receiver) = mpsc::channel(REQUEST_BUFFER);
        let clock = self.clock.clone();
        let load_sender = sender.clone();
        let scheduler = self
            .default_configuration
            .as_ref()
            .and_then(|configuration| configuration.scheduler().cloned());
        let task = match scheduler {
            Some(scheduler) => scheduler.spawn(self.run(updates, sender)),
            None => tokio::spawn(self.run(updates, sender)),
        };
        ScanRequests {
            receiver,
            load_sender,
            clock,
            task,
        }
    }

    async fn run(
        self,
        mut updates: watch::Receiver<Option<PollingConfiguration>>,
        sender: mpsc::Sender<ScanRequest>,
    ) {
        let mut schedule: Option<Schedule> = None;
        let initial = updates
            .borrow_and_update()
            .clone()
            .or_else(|| self.default_configuration.clone());
        match initial {
            Some(configuration) => self.apply(configuration, &mut schedule),
            None => error!("未找到扫描配置，等待外部轮询配置"),
        }

        let mut updates_open = true;
        loop {
            let deadline = schedule.as_ref().map(|s| s.deadline);
            tokio::select! {
                changed = updates.changed(), if updates_open => {
                    if changed.is_err() {
                        debug!("轮询配置来源已关闭，保持当前调度");
                        updates_open = false;
                        continue;
                    }
                    let configuration = updates.borrow_and_update().clone();
                    if let Some(configuration) = configuration {
                        self.apply(configuration, &mut schedule);
                    }
                }
                _ = sleep_until(deadline) => {
                    let Some(current) = schedule.as_mut() else {
                        continue;
                    };
                    let request = ScanRequest::with_start_actual(
                        current.next_fire,
                        ScanType::Poll,
                        self.clock.now(),
                    );
                    debug!("产生轮询扫描请求: {}", request);
                    if sender.send(request).await.is_err() {
                        break;
                    }
                    current.advance(self.clock.now());
                }
                _ = sender.closed() => break,
            }
        }
        debug!("扫描请求调度已停止");
    }

    /// 应用新配置，失败时保留原调度
    fn apply(&self, configuration: PollingConfiguration, schedule: &mut Option<Schedule>) {
        info!("轮询配置: {}", configuration);
        let now = self.clock.now();
        let first_fire = first_poll_time(
            now,
            configuration.time_of_day_utc(),
            configuration.interval(),
        );
        match first_fire {
            Ok(next_fire) => {
                let delay = (next_fire - now).to_std().unwrap_or_default();
                *schedule = Some(Schedule {
                    configuration: configuration.clone(),
                    next_fire,
                    deadline: Instant::now() + delay,
                });
                debug!("首次轮询时间: {}", next_fire.to_rfc3339());
                self.publisher
                    .publish(PollingConfigurationApplied { configuration }.into());
            }
            Err(e) => {
                error!("轮询配置可能有误，调度保持不变，直到读取到新的 polling.properties: {}", e);
                if let Some(active) = schedule.as_ref() {
                    warn!("继续使用: {}", active.configuration);
                }
                self.publisher.publish(
                    PollingConfigurationErrorOccurred {
                        configuration,
                        error: e.into(),
                    }
                    .into(),
                );
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// 扫描请求流
pub struct ScanRequests {
    receiver: mpsc::Receiver<ScanRequest>,
    load_sender: mpsc::Sender<ScanRequest>,
    clock: Arc<dyn Clock>,
    task: JoinHandle<()>,
}

impl ScanRequests {
    /// 下一个扫描请求
    pub async fn next(&mut self) -> Option<ScanRequest> {
        self.receiver.recv().await
    }

    /// 发出一个 LOAD 请求，计划时间即当前时间
    pub async fn request_load(&self) -> ConfigStoreResult<()> {
        let now = self.clock.now();
        self.load_sender
            .send(ScanRequest::with_start_actual(now, ScanType::Load, now))
            .await
            .map_err(|e| ConfigStoreError::Scan {
                message: format!("failed to queue load request: {e}"),
            })
    }

    /// 停止调度
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for ScanRequests {
    fn drop(&mut self) {
        self.task.abort();
    }
}
