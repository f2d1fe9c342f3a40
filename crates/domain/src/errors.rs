use thiserror::Error;

/// 调度系统统一错误类型
#[derive(Error, Debug, Clone)]
pub enum SchedulerError {
    #[error("无效的cron表达式 '{expr}': {message}")]
    InvalidCron { expr: String, message: String },
    #[error("任务不存在: {name}")]
    TaskNotFound { name: String },
    #[error("作业不存在: id={id}")]
    JobNotFound { id: String },
    #[error("存储操作失败: {0}")]
    Store(String),
    #[error("网络调用失败: {0}")]
    Network(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("数据序列化错误: {0}")]
    Serialization(String),
    #[error("不支持的调用协议: {0}")]
    CallerNotFound(String),
    #[error("任务执行失败: {0}")]
    Execution(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    pub fn task_not_found<S: Into<String>>(name: S) -> Self {
        Self::TaskNotFound { name: name.into() }
    }

    pub fn job_not_found<S: Into<String>>(id: S) -> Self {
        Self::JobNotFound { id: id.into() }
    }

    pub fn store_error<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }

    pub fn network_error<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}
