use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use taskfire_config::{AppConfig, LockKind, ResolverKind};
use taskfire_dispatcher::{
    AlertChannel, Alerter, CallerRegistry, Resolver, Scheduler, TaskFetcher, WebhookChannel,
};
use taskfire_domain::{
    CallResult, ConfigRepository, DistributedLock, ExecuteParam, JobRepository, NotifyParam,
    ResultCode, TaskRepository, UserRepository,
};
use taskfire_infrastructure::{
    MemoryConfigRepository, MemoryJobRepository, MemoryLock, MemoryTaskRepository,
    MemoryUserRepository,
};
use taskfire_runner::{Executor, HttpNotifier, ShellHandler};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::shutdown::ShutdownManager;

/// 应用运行模式
#[derive(Debug, Clone)]
pub enum AppMode {
    /// 仅运行调度器（含API接口）
    Dispatcher,
    /// 仅运行执行器
    Runner,
    /// 运行所有组件
    All,
}


/// 主应用程序
///
/// 嵌入式（单进程）部署：仓储与锁都使用内存实现，任务与用户的
/// CRUD维护属于外部API层，不在本进程内。
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    scheduler: Arc<Scheduler>,
    fetcher: Arc<TaskFetcher>,
}

impl Application {
    pub fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        let task_repo: Arc<MemoryTaskRepository> = Arc::new(MemoryTaskRepository::new());
        let job_repo: Arc<MemoryJobRepository> = Arc::new(MemoryJobRepository::new());
        let user_repo: Arc<MemoryUserRepository> = Arc::new(MemoryUserRepository::new());
        let config_repo: Arc<MemoryConfigRepository> = Arc::new(MemoryConfigRepository::new());

        let lock: Arc<dyn DistributedLock> = match config.dispatcher.lock {
            LockKind::Null => Arc::new(taskfire_domain::NullLock),
            LockKind::Memory => Arc::new(MemoryLock::new()),
        };
        let resolver = match config.dispatcher.resolver {
            ResolverKind::Direct => Resolver::Direct,
        };

        let call_timeout = Duration::from_secs(config.dispatcher.call_timeout_seconds);
        let fetcher = Arc::new(TaskFetcher::new(
            task_repo.clone() as Arc<dyn TaskRepository>,
            Duration::from_secs(config.dispatcher.fetch_interval_seconds),
        ));
        let alerter = Arc::new(Alerter::new(
            job_repo.clone() as Arc<dyn JobRepository>,
            task_repo.clone() as Arc<dyn TaskRepository>,
            user_repo as Arc<dyn UserRepository>,
            config_repo as Arc<dyn ConfigRepository>,
            vec![
                AlertChannel::Webhook(WebhookChannel::new(call_timeout)?),
                AlertChannel::Log,
            ],
        ));
        let scheduler = Arc::new(Scheduler::new(
            config.node.clone(),
            fetcher.clone(),
            job_repo as Arc<dyn JobRepository>,
            lock,
            resolver,
            CallerRegistry::new(call_timeout)?,
            alerter,
        ));

        Ok(Self {
            config,
            mode,
            scheduler,
            fetcher,
        })
    }

    pub async fn run(&self, shutdown: &ShutdownManager) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        // All模式下按配置开关决定组件是否启动
        let run_dispatcher = match self.mode {
            AppMode::Dispatcher => true,
            AppMode::All => self.config.dispatcher.enabled,
            AppMode::Runner => false,
        };
        let run_runner = match self.mode {
            AppMode::Runner => true,
            AppMode::All => self.config.runner.enabled,
            AppMode::Dispatcher => false,
        };

        if run_dispatcher {
            handles.extend(self.start_dispatcher(shutdown).await?);
        }
        if run_runner {
            handles.push(self.start_runner(shutdown).await?);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("组件退出异常: {e}");
            }
        }
        info!("所有组件已停止");
        Ok(())
    }

    /// 启动拉取循环、调度循环与调度器API
    async fn start_dispatcher(&self, shutdown: &ShutdownManager) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::new();
        let (heap_tx, heap_rx) = mpsc::channel(1);

        let fetcher = self.fetcher.clone();
        let fetcher_shutdown = shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            fetcher.run(heap_tx, fetcher_shutdown).await;
        }));

        handles.push(tokio::spawn(
            self.scheduler.clone().run(heap_rx, shutdown.subscribe()),
        ));

        if self.config.api.enabled {
            let mut app = api_router(self.scheduler.clone());
            if self.config.api.cors_enabled {
                app = app.layer(CorsLayer::permissive());
            }
            handles.push(
                serve(&self.config.api.bind_address, app, "调度器API", shutdown).await?,
            );
        }
        Ok(handles)
    }

    /// 启动执行器服务，内置shell处理器
    async fn start_runner(&self, shutdown: &ShutdownManager) -> Result<JoinHandle<()>> {
        let notifier = Arc::new(HttpNotifier::new(
            self.config.runner.scheduler_address.clone(),
            Duration::from_secs(self.config.runner.notify_timeout_seconds),
        )?);
        let mut executor = Executor::new(notifier);
        executor.register("Shell", Arc::new(ShellHandler));

        let app = taskfire_runner::router(Arc::new(executor));
        serve(&self.config.runner.bind_address, app, "执行器", shutdown).await
    }
}

async fn serve(
    bind_address: &str,
    app: Router,
    name: &'static str,
    shutdown: &ShutdownManager,
) -> Result<JoinHandle<()>> {
    let listener = TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("绑定地址失败: {bind_address}"))?;
    info!("{name}监听于 {bind_address}");

    let mut rx = shutdown.subscribe();
    Ok(tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await;
        if let Err(e) = result {
            error!("{name}服务异常退出: {e}");
        } else {
            info!("{name}服务已停止");
        }
    }))
}

/// 调度器侧的线上接口：手动触发、重试与执行结果通知。
/// 任务/用户的CRUD与鉴权属于外部API层。
fn api_router(scheduler: Arc<Scheduler>) -> Router {
    Router::new()
        .route("/api/task/execute", post(execute_handler))
        .route("/api/task/retry/{id}", post(retry_handler))
        .route("/api/task/notify", post(notify_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(scheduler)
}

async fn execute_handler(
    State(scheduler): State<Arc<Scheduler>>,
    Json(param): Json<ExecuteParam>,
) -> Json<CallResult> {
    match scheduler.execute(&param.name, param.args).await {
        // info携带新作业id
        Ok(id) => Json(CallResult {
            code: ResultCode::Success,
            info: id,
        }),
        Err(e) => Json(CallResult::fail(e.to_string())),
    }
}

async fn retry_handler(
    State(scheduler): State<Arc<Scheduler>>,
    Path(id): Path<String>,
) -> Json<CallResult> {
    match scheduler.retry(&id).await {
        Ok(()) => Json(CallResult::ok()),
        Err(e) => Json(CallResult::fail(e.to_string())),
    }
}

async fn notify_handler(
    State(scheduler): State<Arc<Scheduler>>,
    Json(param): Json<NotifyParam>,
) -> Json<CallResult> {
    match scheduler.handle_notify(param).await {
        Ok(()) => Json(CallResult::ok()),
        Err(e) => Json(CallResult::fail(e.to_string())),
    }
}
