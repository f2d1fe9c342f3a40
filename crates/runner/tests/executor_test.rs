//! 执行器并发护栏、panic隔离与HTTP接口测试

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use taskfire_domain::{
    Args, Batch, CallResult, Job, JobMode, JobPayload, NotifyParam, ResultCode, SchedulerError,
    SchedulerResult, SplitResult, Task,
};
use taskfire_runner::{Executor, Handler, HandlerFn, ResultNotifier};
use tokio::sync::mpsc;

struct ChannelNotifier(mpsc::UnboundedSender<NotifyParam>);

#[async_trait]
impl ResultNotifier for ChannelNotifier {
    async fn notify(&self, param: NotifyParam) -> SchedulerResult<()> {
        let _ = self.0.send(param);
        Ok(())
    }
}

struct SlowHandler {
    invocations: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for SlowHandler {
    async fn handle(&self, _job: &JobPayload) -> SchedulerResult<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(())
    }
}

struct PanicHandler;

#[async_trait]
impl Handler for PanicHandler {
    async fn handle(&self, _job: &JobPayload) -> SchedulerResult<()> {
        panic!("boom in handler");
    }
}

struct SplittingHandler;

#[async_trait]
impl Handler for SplittingHandler {
    async fn handle(&self, _job: &JobPayload) -> SchedulerResult<()> {
        Ok(())
    }

    async fn split(&self, job: &JobPayload) -> Option<SchedulerResult<Vec<Batch>>> {
        Some(Ok(vec![
            Batch {
                id: format!("{}-0", job.id),
                args: Args::from([("shard", "0")]),
            },
            Batch {
                id: format!("{}-1", job.id),
                args: Args::from([("shard", "1")]),
            },
        ]))
    }
}

fn payload(task: &str, handler: &str, mode: JobMode, fire_ms: i64) -> JobPayload {
    let task = Task::new(task, "http://runner1", handler, vec![]);
    let mut p = JobPayload::from(&Job::new(&task, "node1", Args::new(), mode, Utc::now()));
    p.fire = fire_ms;
    p
}

fn build_executor(
    register: impl FnOnce(&mut Executor),
) -> (Arc<Executor>, mpsc::UnboundedReceiver<NotifyParam>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut executor = Executor::new(Arc::new(ChannelNotifier(tx)));
    register(&mut executor);
    (Arc::new(executor), rx)
}

async fn collect(rx: &mut mpsc::UnboundedReceiver<NotifyParam>, n: usize) -> Vec<NotifyParam> {
    let mut out = Vec::new();
    for _ in 0..n {
        let param = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("等待结果通知超时")
            .unwrap();
        out.push(param);
    }
    out
}

#[tokio::test]
async fn test_auto_mode_dedup_single_invocation_two_notifications() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(SlowHandler {
        invocations: invocations.clone(),
    });
    let (executor, mut rx) = build_executor(|e| e.register("Slow", handler.clone()));

    let a = payload("t1", "Slow", JobMode::Auto, 1_700_000_000_000);
    let b = payload("t1", "Slow", JobMode::Auto, 1_700_000_001_000);
    let h1 = tokio::spawn(executor.clone().handle(a));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let h2 = tokio::spawn(executor.clone().handle(b));
    let _ = tokio::join!(h1, h2);

    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    let notifications = collect(&mut rx, 2).await;
    let mut codes: Vec<ResultCode> = notifications.iter().map(|n| n.code).collect();
    codes.sort_by_key(|c| c.as_i32());
    assert_eq!(codes, vec![ResultCode::Success, ResultCode::TaskIsRunning]);

    let rejected = notifications
        .iter()
        .find(|n| n.code == ResultCode::TaskIsRunning)
        .unwrap();
    assert!(rejected.info.contains("task is already running"));
}

#[tokio::test]
async fn test_manual_mode_bypasses_guard() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(SlowHandler {
        invocations: invocations.clone(),
    });
    let (executor, mut rx) = build_executor(|e| e.register("Slow", handler.clone()));

    let a = payload("t1", "Slow", JobMode::Manual, 0);
    let b = payload("t1", "Slow", JobMode::Manual, 0);
    let h1 = tokio::spawn(executor.clone().handle(a));
    let h2 = tokio::spawn(executor.clone().handle(b));
    let _ = tokio::join!(h1, h2);

    assert_eq!(invocations.load(Ordering::SeqCst), 2);
    let notifications = collect(&mut rx, 2).await;
    assert!(notifications.iter().all(|n| n.code == ResultCode::Success));
}

#[tokio::test]
async fn test_unknown_handler_notifies_not_found() {
    let (executor, mut rx) = build_executor(|_| {});

    executor
        .clone()
        .handle(payload("t1", "Nope", JobMode::Auto, 0))
        .await;

    let notifications = collect(&mut rx, 1).await;
    assert_eq!(notifications[0].code, ResultCode::NotFound);
    assert_eq!(notifications[0].info, "handler not found");
}

#[tokio::test]
async fn test_panic_becomes_failed_notification_and_guard_released() {
    let (executor, mut rx) = build_executor(|e| {
        e.register("Panic", Arc::new(PanicHandler));
    });

    executor
        .clone()
        .handle(payload("t1", "Panic", JobMode::Auto, 0))
        .await;
    let first = collect(&mut rx, 1).await;
    assert_eq!(first[0].code, ResultCode::Failed);
    assert!(first[0].info.contains("boom in handler"));

    // 护栏已释放，同任务可再次执行
    executor
        .clone()
        .handle(payload("t1", "Panic", JobMode::Auto, 1000))
        .await;
    let second = collect(&mut rx, 1).await;
    assert_eq!(second[0].code, ResultCode::Failed);
}

#[tokio::test]
async fn test_handler_error_text_propagates() {
    let (executor, mut rx) = build_executor(|e| {
        e.register(
            "Fail",
            Arc::new(HandlerFn::new(|_job: JobPayload| async {
                Err(SchedulerError::Execution("数据源不可用".to_string()))
            })),
        );
    });

    executor
        .clone()
        .handle(payload("t1", "Fail", JobMode::Manual, 0))
        .await;
    let notifications = collect(&mut rx, 1).await;
    assert_eq!(notifications[0].code, ResultCode::Failed);
    assert!(notifications[0].info.contains("数据源不可用"));
}

#[tokio::test]
async fn test_split_codes() {
    let (executor, _rx) = build_executor(|e| {
        e.register("Plain", Arc::new(HandlerFn::new(|_job: JobPayload| async { Ok(()) })));
        e.register("Parallel", Arc::new(SplittingHandler));
    });

    let unknown = executor.split(&payload("t1", "Nope", JobMode::Manual, 0)).await;
    assert_eq!(unknown.code, ResultCode::NotFound);

    let unsupported = executor.split(&payload("t1", "Plain", JobMode::Manual, 0)).await;
    assert_eq!(unsupported.code, ResultCode::NotSupported);

    let split = executor
        .split(&payload("t1", "Parallel", JobMode::Manual, 0))
        .await;
    assert_eq!(split.code, ResultCode::Success);
    let batches = split.batches.unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].args.get("shard"), Some("0"));
}

#[tokio::test]
async fn test_http_routes_accept_and_notify() {
    let (executor, mut rx) = build_executor(|e| {
        e.register("Ok", Arc::new(HandlerFn::new(|_job: JobPayload| async { Ok(()) })));
    });

    let app = taskfire_runner::router(executor);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let accepted: CallResult = client
        .post(format!("http://127.0.0.1:{}/task/execute", addr.port()))
        .json(&payload("t1", "Ok", JobMode::Manual, 0))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(accepted.success());

    let notifications = collect(&mut rx, 1).await;
    assert_eq!(notifications[0].code, ResultCode::Success);

    let split: SplitResult = client
        .post(format!("http://127.0.0.1:{}/task/split", addr.port()))
        .json(&payload("t1", "Ok", JobMode::Manual, 0))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(split.code, ResultCode::NotSupported);
}
