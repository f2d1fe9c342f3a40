//! 调度核心循环
//!
//! 单一控制循环独占任务堆：等待堆顶触发时刻、触发时刻到达后把
//! 派发交给独立的并发任务，循环本身永不等待网络I/O。堆替换与
//! 停机广播随时打断等待。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use taskfire_domain::{
    Args, DispatchOutcome, DistributedLock, ExecuteOutcome, Job, JobMode, JobPayload,
    JobRepository, NotifyParam, OutcomeStatus, ResultCode, SchedulerError, SchedulerResult, Task,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::alerter::Alerter;
use crate::caller::CallerRegistry;
use crate::fetcher::TaskFetcher;
use crate::heap::TaskHeap;
use crate::resolver::Resolver;

/// 堆为空或尚未收到堆时的空转等待
const IDLE_WAIT: Duration = Duration::from_secs(60);

pub struct Scheduler {
    node: String,
    fetcher: Arc<TaskFetcher>,
    job_repo: Arc<dyn JobRepository>,
    lock: Arc<dyn DistributedLock>,
    resolver: Resolver,
    callers: CallerRegistry,
    alerter: Arc<Alerter>,
}

impl Scheduler {
    pub fn new(
        node: String,
        fetcher: Arc<TaskFetcher>,
        job_repo: Arc<dyn JobRepository>,
        lock: Arc<dyn DistributedLock>,
        resolver: Resolver,
        callers: CallerRegistry,
        alerter: Arc<Alerter>,
    ) -> Self {
        Self {
            node,
            fetcher,
            job_repo,
            lock,
            resolver,
            callers,
            alerter,
        }
    }

    /// 主循环，持有当前堆直到被新堆替换或收到停机广播
    pub async fn run(
        self: Arc<Self>,
        mut heap_rx: mpsc::Receiver<TaskHeap>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(node = %self.node, "调度循环启动");
        let mut heap: Option<TaskHeap> = None;

        loop {
            let wait = next_wait(heap.as_ref());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Some(heap) = heap.as_mut() {
                        Arc::clone(&self).fire_due(heap);
                    }
                }
                replaced = heap_rx.recv() => {
                    match replaced {
                        Some(new_heap) => {
                            debug!(count = new_heap.len(), "任务堆已替换");
                            heap = Some(new_heap);
                        }
                        None => break,
                    }
                }
                _ = shutdown.recv() => {
                    info!("调度循环退出");
                    break;
                }
            }
        }
    }

    /// 派发堆中所有已到期的条目：同一轮内先排空到期前缀再重新armed等待
    fn fire_due(self: Arc<Self>, heap: &mut TaskHeap) {
        let now = Utc::now();
        while let Some(item) = heap.peek() {
            if item.fire > now {
                break;
            }
            let task = item.task.clone();
            let fire = item.fire;
            heap.reschedule_top(now);

            let scheduler = Arc::clone(&self);
            tokio::spawn(async move {
                scheduler.dispatch_auto(task, fire).await;
            });
        }
    }

    async fn dispatch_auto(&self, task: Task, fire: DateTime<Utc>) {
        let job = Job::new(&task, &self.node, Args::new(), JobMode::Auto, fire);
        if let Err(e) = self.dispatch(&task, job, false).await {
            error!(task = %task.name, "自动作业派发失败: {e}");
        }
    }

    /// 手动触发：同步查任务，派发相对调用方是发后即忘，
    /// 网络结果只体现在作业记录与告警上。返回作业id
    pub async fn execute(self: Arc<Self>, name: &str, args: Args) -> SchedulerResult<String> {
        let task = self
            .fetcher
            .find(name)
            .await?
            .ok_or_else(|| SchedulerError::task_not_found(name))?;

        let job = Job::new(&task, &self.node, args, JobMode::Manual, Utc::now());
        let id = job.id.clone();

        let scheduler = Arc::clone(&self);
        tokio::spawn(async move {
            if let Err(e) = scheduler.dispatch(&task, job, false).await {
                error!(task = %task.name, "手动作业派发失败: {e}");
            }
        });
        Ok(id)
    }

    /// 重试：复用原作业id与触发时间，持久化记录被更新而不是新建
    pub async fn retry(self: Arc<Self>, id: &str) -> SchedulerResult<()> {
        let mut job = self
            .job_repo
            .find(id)
            .await?
            .ok_or_else(|| SchedulerError::job_not_found(id))?;
        let task = self
            .fetcher
            .find(&job.task)
            .await?
            .ok_or_else(|| SchedulerError::task_not_found(&job.task))?;

        job.dispatch = DispatchOutcome::default();
        job.execute = ExecuteOutcome::default();

        let scheduler = Arc::clone(&self);
        tokio::spawn(async move {
            if let Err(e) = scheduler.dispatch(&task, job, true).await {
                error!(task = %task.name, "作业重试派发失败: {e}");
            }
        });
        Ok(())
    }

    /// 派发协议
    ///
    /// 1. 自动作业先抢占(任务, 触发时刻)锁，抢不到说明其他节点已派发，
    ///    静默返回；
    /// 2. 非重试先落库，没有持久记录的作业不会被送到执行器，落库失败
    ///    即中止（不排队重试，恢复后由人工Retry）；
    /// 3. 解析执行器地址；
    /// 4. 按协议调用执行器，地址级故障转移；
    /// 5. 回写派发结果，回写失败只记日志；
    /// 6. 调用失败异步触发告警。
    async fn dispatch(&self, task: &Task, mut job: Job, is_retry: bool) -> SchedulerResult<()> {
        if job.mode == JobMode::Auto {
            let fire = job.fire_time.timestamp_millis();
            if !self.lock.lock(&job.task, fire).await {
                debug!(task = %job.task, fire, "触发时刻已被其他节点锁定，跳过");
                return Ok(());
            }
        }

        if !is_retry {
            self.job_repo.create(&job).await?;
        }

        let (scheme, addresses) = self.resolver.resolve(&task.runner)?;
        let caller = self.callers.get(&scheme)?;

        let payload = JobPayload::from(&job);
        let result = caller.call(&addresses, &payload).await;

        job.dispatch = DispatchOutcome {
            status: OutcomeStatus::from_success(result.success()),
            time: Some(Utc::now()),
            error: if result.success() {
                String::new()
            } else {
                result.info.clone()
            },
        };
        if let Err(e) = self.job_repo.modify_dispatch(&job).await {
            error!(job = %job.id, "更新派发结果失败: {e}");
        }

        if result.success() {
            info!(task = %job.task, job = %job.id, "作业已派发");
        } else {
            warn!(task = %job.task, job = %job.id, "作业派发失败: {}", result.info);
            let alerter = Arc::clone(&self.alerter);
            let job_id = job.id.clone();
            let info = result.info.clone();
            tokio::spawn(async move {
                alerter.alert(&job_id, &info).await;
            });
        }
        Ok(())
    }

    /// 执行器结果通知：回写执行结果，失败时异步触发告警
    pub async fn handle_notify(&self, param: NotifyParam) -> SchedulerResult<()> {
        let mut job = self
            .job_repo
            .find(&param.id)
            .await?
            .ok_or_else(|| SchedulerError::job_not_found(&param.id))?;

        let success = param.code == ResultCode::Success;
        job.execute = ExecuteOutcome {
            status: OutcomeStatus::from_success(success),
            error: param.info.clone(),
            start_time: DateTime::<Utc>::from_timestamp_millis(param.start),
            end_time: DateTime::<Utc>::from_timestamp_millis(param.end),
        };
        self.job_repo.modify_execute(&job).await?;

        if !success {
            warn!(task = %job.task, job = %job.id, "作业执行失败: {}", param.info);
            let alerter = Arc::clone(&self.alerter);
            let job_id = job.id.clone();
            let info = param.info.clone();
            tokio::spawn(async move {
                alerter.alert(&job_id, &info).await;
            });
        }
        Ok(())
    }
}

fn next_wait(heap: Option<&TaskHeap>) -> Duration {
    match heap.and_then(|h| h.peek()) {
        Some(item) => (item.fire - Utc::now()).to_std().unwrap_or(Duration::ZERO),
        None => IDLE_WAIT,
    }
}
