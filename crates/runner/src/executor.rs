//! 执行器核心
//!
//! 处理器注册表 + 自动模式下的同任务并发护栏。执行在独立任务中
//! 进行，panic被转换为失败通知，护栏条目在处理器返回后无条件
//! 移除。每次执行尝试恰好产生一次结果通知，包括短路路径。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskfire_domain::{
    Batch, JobMode, JobPayload, NotifyParam, ResultCode, SchedulerResult, SplitResult,
};
use tracing::{error, info};

/// 任务处理器
///
/// `split`是可并行任务的拆分能力，默认不支持（返回None）。
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, job: &JobPayload) -> SchedulerResult<()>;

    async fn split(&self, _job: &JobPayload) -> Option<SchedulerResult<Vec<Batch>>> {
        None
    }
}

pub struct Executor {
    handlers: HashMap<String, Arc<dyn Handler>>,
    /// 自动模式在途任务：任务名 → 触发毫秒
    running: Mutex<HashMap<String, i64>>,
    notifier: Arc<dyn crate::notifier::ResultNotifier>,
}

impl Executor {
    pub fn new(notifier: Arc<dyn crate::notifier::ResultNotifier>) -> Self {
        Self {
            handlers: HashMap::new(),
            running: Mutex::new(HashMap::new()),
            notifier,
        }
    }

    /// 注册处理器，须在开始服务前完成
    pub fn register<S: Into<String>>(&mut self, name: S, handler: Arc<dyn Handler>) {
        self.handlers.insert(name.into(), handler);
    }

    /// 执行一个作业并回传结果
    ///
    /// 未知处理器与自动模式的并发冲突都短路为一次通知，不触发执行。
    pub async fn handle(self: Arc<Self>, payload: JobPayload) {
        info!(job = %payload.id, task = %payload.task, "收到作业");
        let start = Utc::now();

        let Some(handler) = self.handlers.get(&payload.handler) else {
            self.notify(&payload, start, ResultCode::NotFound, "handler not found")
                .await;
            return;
        };
        let handler = Arc::clone(handler);

        let mut guarded = false;
        if payload.mode == JobMode::Auto {
            let in_flight = {
                let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
                match running.get(&payload.task) {
                    Some(fire) => Some(*fire),
                    None => {
                        running.insert(payload.task.clone(), payload.fire);
                        guarded = true;
                        None
                    }
                }
            };
            if let Some(fire) = in_flight {
                let fire_text = DateTime::<Utc>::from_timestamp_millis(fire)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| fire.to_string());
                self.notify(
                    &payload,
                    start,
                    ResultCode::TaskIsRunning,
                    &format!("task is already running(fire: {fire_text})"),
                )
                .await;
                return;
            }
        }

        // panic隔离：处理器跑在独立任务里，panic沿JoinError回收
        let job = payload.clone();
        let outcome = tokio::spawn(async move { handler.handle(&job).await }).await;

        if guarded {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            running.remove(&payload.task);
        }

        match outcome {
            Ok(Ok(())) => self.notify(&payload, start, ResultCode::Success, "").await,
            Ok(Err(e)) => {
                self.notify(&payload, start, ResultCode::Failed, &e.to_string())
                    .await
            }
            Err(e) => {
                let info = if e.is_panic() {
                    panic_text(e.into_panic())
                } else {
                    e.to_string()
                };
                self.notify(&payload, start, ResultCode::Failed, &info).await
            }
        }
    }

    /// 拆分作业为可并行的子批次
    pub async fn split(&self, payload: &JobPayload) -> SplitResult {
        let Some(handler) = self.handlers.get(&payload.handler) else {
            return SplitResult {
                code: ResultCode::NotFound,
                info: "handler not found".to_string(),
                batches: None,
            };
        };
        match handler.split(payload).await {
            None => SplitResult {
                code: ResultCode::NotSupported,
                info: "not supported".to_string(),
                batches: None,
            },
            Some(Err(e)) => SplitResult {
                code: ResultCode::Failed,
                info: e.to_string(),
                batches: None,
            },
            Some(Ok(batches)) => SplitResult {
                code: ResultCode::Success,
                info: String::new(),
                batches: Some(batches),
            },
        }
    }

    async fn notify(&self, payload: &JobPayload, start: DateTime<Utc>, code: ResultCode, info: &str) {
        let param = NotifyParam {
            code,
            info: info.to_string(),
            id: payload.id.clone(),
            start: start.timestamp_millis(),
            end: Utc::now().timestamp_millis(),
        };
        // 通知投递失败只记日志，不重试
        if let Err(e) = self.notifier.notify(param).await {
            error!(job = %payload.id, "回传作业结果失败: {e}");
        }
    }
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "handler panicked".to_string()
    }
}
