//! 任务拉取循环
//!
//! 周期性读取任务集合指纹（启用数量 + 最近修改时间），变化时拉取
//! 全部启用任务、重建任务堆并通过单槽通道交给调度循环。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use taskfire_domain::{SchedulerResult, Task, TaskRepository, TaskState};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::heap::TaskHeap;

pub struct TaskFetcher {
    task_repo: Arc<dyn TaskRepository>,
    interval: Duration,
}

impl TaskFetcher {
    pub fn new(task_repo: Arc<dyn TaskRepository>, interval: Duration) -> Self {
        Self {
            task_repo,
            interval,
        }
    }

    /// 手动Execute/Retry直接读库，不经过缓存的堆，避免取到过期任务
    pub async fn find(&self, name: &str) -> SchedulerResult<Option<Task>> {
        self.task_repo.find(name).await
    }

    /// 先立即刷新一次，之后按固定间隔轮询，直到收到停机广播
    pub async fn run(&self, tx: mpsc::Sender<TaskHeap>, mut shutdown: broadcast::Receiver<()>) {
        let mut last_state: Option<TaskState> = None;
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh(&tx, &mut last_state).await {
                        error!("刷新任务列表失败: {e}");
                    }
                }
                _ = shutdown.recv() => {
                    info!("任务拉取循环退出");
                    break;
                }
            }
        }
    }

    async fn refresh(
        &self,
        tx: &mpsc::Sender<TaskHeap>,
        last_state: &mut Option<TaskState>,
    ) -> SchedulerResult<()> {
        let state = self.task_repo.get_state().await?;
        if last_state.as_ref() == Some(&state) {
            return Ok(());
        }

        let tasks = self.task_repo.fetch_enabled().await?;
        let heap = TaskHeap::from_tasks(tasks, Utc::now());
        info!(count = heap.len(), "任务列表已刷新");

        // 单槽通道：上一份堆未被消费时放弃本次投递，指纹不推进，
        // 下个周期会重新投递
        match tx.try_send(heap) {
            Ok(()) => *last_state = Some(state),
            Err(_) => debug!("调度循环尚未消费上一份任务堆，本次投递跳过"),
        }
        Ok(())
    }
}
