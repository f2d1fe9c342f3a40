//! 仓储端口定义
//!
//! 调度核心通过这些trait访问任务、作业、用户与配置数据，
//! 具体存储由infrastructure层实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::SchedulerResult;
use crate::models::{Args, Job, Task, User};

/// 任务集合的变更指纹，拉取循环据此判断是否需要重建调度堆
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskState {
    /// 启用任务数量
    pub count: u64,
    /// 最近修改时间
    pub modify_time: Option<DateTime<Utc>>,
}

/// 任务仓储
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 按名称查找任务（含禁用任务）
    async fn find(&self, name: &str) -> SchedulerResult<Option<Task>>;

    /// 拉取全部启用任务
    async fn fetch_enabled(&self) -> SchedulerResult<Vec<Task>>;

    /// 获取任务集合指纹
    async fn get_state(&self) -> SchedulerResult<TaskState>;
}

/// 作业仓储
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn find(&self, id: &str) -> SchedulerResult<Option<Job>>;

    /// 新建作业记录，重试场景下按id覆盖写
    async fn create(&self, job: &Job) -> SchedulerResult<()>;

    /// 更新派发结果
    async fn modify_dispatch(&self, job: &Job) -> SchedulerResult<()>;

    /// 更新执行结果
    async fn modify_execute(&self, job: &Job) -> SchedulerResult<()>;
}

/// 用户仓储，告警时按维护人id批量取用户
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn fetch(&self, ids: &[String]) -> SchedulerResult<Vec<User>>;
}

/// 系统配置仓储，按键取参数组（如告警通道的模板与地址）
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn find(&self, key: &str) -> SchedulerResult<Args>;
}
