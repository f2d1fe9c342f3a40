use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::{Args, Task};

/// 作业模式：自动（由调度循环按触发器产生）或手动（Execute/Retry产生）
///
/// 线上协议中以整数编码：0-自动，1-手动。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    Auto,
    Manual,
}

impl Serialize for JobMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(match self {
            JobMode::Auto => 0,
            JobMode::Manual => 1,
        })
    }
}

impl<'de> Deserialize<'de> for JobMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i32::deserialize(deserializer)? {
            0 => Ok(JobMode::Auto),
            1 => Ok(JobMode::Manual),
            other => Err(de::Error::custom(format!("无效的作业模式: {other}"))),
        }
    }
}

/// 派发/执行结果状态：0-未知，1-成功，2-失败
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutcomeStatus {
    #[default]
    Unknown,
    Success,
    Failed,
}

impl OutcomeStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            OutcomeStatus::Success
        } else {
            OutcomeStatus::Failed
        }
    }
}

impl Serialize for OutcomeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(match self {
            OutcomeStatus::Unknown => 0,
            OutcomeStatus::Success => 1,
            OutcomeStatus::Failed => 2,
        })
    }
}

impl<'de> Deserialize<'de> for OutcomeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i32::deserialize(deserializer)? {
            0 => Ok(OutcomeStatus::Unknown),
            1 => Ok(OutcomeStatus::Success),
            2 => Ok(OutcomeStatus::Failed),
            other => Err(de::Error::custom(format!("无效的结果状态: {other}"))),
        }
    }
}

/// 派发结果，由调度器在远程调用返回后写入一次
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// 执行结果，由执行器通知回传后写入一次
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteOutcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// 作业：任务的一次具体触发实例
///
/// 重试复用原作业id，持久化记录被更新而不是新建。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub task: String,
    pub handler: String,
    /// 创建该作业的调度节点标识
    pub scheduler: String,
    pub mode: JobMode,
    pub args: Args,
    pub fire_time: DateTime<Utc>,
    #[serde(default)]
    pub dispatch: DispatchOutcome,
    #[serde(default)]
    pub execute: ExecuteOutcome,
}

impl Job {
    /// 从任务生成新作业，参数为任务默认值与调用方覆盖值的合并
    pub fn new(task: &Task, node: &str, overrides: Args, mode: JobMode, fire: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            task: task.name.clone(),
            handler: task.handler.clone(),
            scheduler: node.to_string(),
            mode,
            args: task.args.merge(&overrides),
            fire_time: fire,
            dispatch: DispatchOutcome::default(),
            execute: ExecuteOutcome::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_wire_encoding() {
        assert_eq!(serde_json::to_string(&JobMode::Auto).unwrap(), "0");
        assert_eq!(serde_json::to_string(&JobMode::Manual).unwrap(), "1");
        assert_eq!(serde_json::from_str::<JobMode>("1").unwrap(), JobMode::Manual);
        assert!(serde_json::from_str::<JobMode>("7").is_err());
    }

    #[test]
    fn test_new_job_merges_args() {
        let mut task = Task::new("t1", "http://runner1", "Report", vec![]);
        task.args = Args::from([("a", "1"), ("b", "2")]);

        let job = Job::new(
            &task,
            "node1",
            Args::from([("b", "3")]),
            JobMode::Manual,
            Utc::now(),
        );
        assert_eq!(job.args.get("a"), Some("1"));
        assert_eq!(job.args.get("b"), Some("3"));
        assert_eq!(job.task, "t1");
        assert!(!job.id.is_empty());
    }
}
