//! 调度器与执行器之间的线上协议类型。
//!
//! 派发调用 `POST <runner>/task/execute`、拆分调用 `POST <runner>/task/split`
//! 与结果通知 `POST <scheduler>/api/task/notify` 共用这里定义的编码。

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::models::{Args, Job, JobMode};

/// 调用结果码（线上共享枚举）
///
/// 0-成功，1-失败，2-处理器不存在，3-不支持，4-任务正在运行
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultCode {
    #[default]
    Success,
    Failed,
    NotFound,
    NotSupported,
    TaskIsRunning,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::Failed => 1,
            ResultCode::NotFound => 2,
            ResultCode::NotSupported => 3,
            ResultCode::TaskIsRunning => 4,
        }
    }
}

impl Serialize for ResultCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for ResultCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i32::deserialize(deserializer)? {
            0 => Ok(ResultCode::Success),
            1 => Ok(ResultCode::Failed),
            2 => Ok(ResultCode::NotFound),
            3 => Ok(ResultCode::NotSupported),
            4 => Ok(ResultCode::TaskIsRunning),
            other => Err(de::Error::custom(format!("无效的结果码: {other}"))),
        }
    }
}

/// 远程调用的应答体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallResult {
    pub code: ResultCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info: String,
}

impl CallResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn fail<S: Into<String>>(info: S) -> Self {
        Self {
            code: ResultCode::Failed,
            info: info.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == ResultCode::Success
    }
}

/// 派发到执行器的作业体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub id: String,
    pub task: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub args: Args,
    pub mode: JobMode,
    /// 触发时间，unix毫秒
    pub fire: i64,
}

impl From<&Job> for JobPayload {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            task: job.task.clone(),
            handler: job.handler.clone(),
            args: job.args.clone(),
            mode: job.mode,
            fire: job.fire_time.timestamp_millis(),
        }
    }
}

/// 手动触发请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteParam {
    pub name: String,
    #[serde(default)]
    pub args: Args,
}

/// 执行器回传的执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyParam {
    pub code: ResultCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info: String,
    pub id: String,
    /// 执行开始时间，unix毫秒
    pub start: i64,
    /// 执行结束时间，unix毫秒
    pub end: i64,
}

/// 拆分调用的应答体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitResult {
    pub code: ResultCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batches: Option<Vec<Batch>>,
}

/// 可并行作业的一个子批次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    #[serde(default)]
    pub args: Args,
}
