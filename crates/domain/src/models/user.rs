use serde::{Deserialize, Serialize};

/// 用户（任务维护人），告警时作为通知对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    /// 即时通讯账号，webhook通道@提醒时使用
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub im: String,
}
