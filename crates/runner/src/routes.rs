//! 执行器HTTP接口

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use taskfire_domain::{CallResult, JobPayload, SplitResult};
use tower_http::trace::TraceLayer;

use crate::executor::Executor;

pub fn router(executor: Arc<Executor>) -> Router {
    Router::new()
        .route("/task/execute", post(execute))
        .route("/task/split", post(split))
        .layer(TraceLayer::new_for_http())
        .with_state(executor)
}

/// 立即受理，执行与结果通知异步完成
async fn execute(
    State(executor): State<Arc<Executor>>,
    Json(payload): Json<JobPayload>,
) -> Json<CallResult> {
    tokio::spawn(executor.handle(payload));
    Json(CallResult::ok())
}

async fn split(
    State(executor): State<Arc<Executor>>,
    Json(payload): Json<JobPayload>,
) -> Json<SplitResult> {
    Json(executor.split(&payload).await)
}
