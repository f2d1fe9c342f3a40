use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Args;

/// 任务定义
///
/// 一条可循环调度的工作单元，由外部CRUD接口维护，调度核心只读。
///
/// - `name`: 任务唯一名称
/// - `runner`: 执行器地址，形如 `http://runner1:8001`
/// - `handler`: 执行器内注册的处理器名称
/// - `args`: 默认参数，派发时可被调用方参数覆盖
/// - `triggers`: cron触发表达式列表，支持可选秒字段和 `@daily` 等描述符
/// - `enabled`: 是否参与自动调度
/// - `maintainers`: 维护人（用户id），告警时作为通知对象
/// - `alerts`: 告警通道名称列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub runner: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub enabled: bool,
    #[serde(default)]
    pub maintainers: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<String>,
    pub modify_time: DateTime<Utc>,
}

impl Task {
    /// 创建一个启用状态的任务
    pub fn new<S: Into<String>>(name: S, runner: S, handler: S, triggers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            runner: runner.into(),
            handler: handler.into(),
            args: Args::new(),
            triggers,
            description: String::new(),
            enabled: true,
            maintainers: Vec::new(),
            alerts: Vec::new(),
            modify_time: Utc::now(),
        }
    }
}
