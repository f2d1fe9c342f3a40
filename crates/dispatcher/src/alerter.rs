//! 告警触发与通道分发
//!
//! 派发或执行失败时按作业id触发：取作业与所属任务，任务未声明
//! 告警通道则静默返回；否则构建模板变量、取维护人列表，逐通道
//! 发送。单通道失败只记日志，不影响其他通道。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use taskfire_domain::{
    Args, ConfigRepository, Job, JobMode, JobRepository, SchedulerError, SchedulerResult, Task,
    TaskRepository, User, UserRepository,
};
use tracing::{error, info, warn};

pub struct Alerter {
    job_repo: Arc<dyn JobRepository>,
    task_repo: Arc<dyn TaskRepository>,
    user_repo: Arc<dyn UserRepository>,
    config_repo: Arc<dyn ConfigRepository>,
    channels: Vec<AlertChannel>,
}

impl Alerter {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        task_repo: Arc<dyn TaskRepository>,
        user_repo: Arc<dyn UserRepository>,
        config_repo: Arc<dyn ConfigRepository>,
        channels: Vec<AlertChannel>,
    ) -> Self {
        Self {
            job_repo,
            task_repo,
            user_repo,
            config_repo,
            channels,
        }
    }

    /// 发送告警，任何失败只记日志，调用方无需处理
    pub async fn alert(&self, job_id: &str, info: &str) {
        if let Err(e) = self.try_alert(job_id, info).await {
            error!(job = %job_id, "告警发送失败: {e}");
        }
    }

    async fn try_alert(&self, job_id: &str, info: &str) -> SchedulerResult<()> {
        let job = self
            .job_repo
            .find(job_id)
            .await?
            .ok_or_else(|| SchedulerError::job_not_found(job_id))?;
        let task = self
            .task_repo
            .find(&job.task)
            .await?
            .ok_or_else(|| SchedulerError::task_not_found(&job.task))?;

        if task.alerts.is_empty() {
            return Ok(());
        }

        let vars = build_vars(&job, &task, info);
        let users = self.user_repo.fetch(&task.maintainers).await?;

        for name in &task.alerts {
            let Some(channel) = self.channels.iter().find(|c| c.name() == name) else {
                warn!(channel = %name, task = %task.name, "未知的告警通道，跳过");
                continue;
            };
            let options = match self.config_repo.find(&format!("alert.{name}")).await {
                Ok(options) => options,
                Err(e) => {
                    error!(channel = %name, "读取告警通道配置失败: {e}");
                    continue;
                }
            };
            if let Err(e) = channel.send(&options, &users, &vars).await {
                error!(channel = %name, job = %job.id, "告警通道发送失败: {e}");
            }
        }
        Ok(())
    }
}

/// 模板变量表，通道模板以 {{name}} 引用
fn build_vars(job: &Job, task: &Task, info: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("task".to_string(), task.name.clone());
    vars.insert("handler".to_string(), job.handler.clone());
    vars.insert("runner".to_string(), task.runner.clone());
    vars.insert("job".to_string(), job.id.clone());
    vars.insert("scheduler".to_string(), job.scheduler.clone());
    vars.insert(
        "mode".to_string(),
        match job.mode {
            JobMode::Auto => "自动".to_string(),
            JobMode::Manual => "手动".to_string(),
        },
    );
    vars.insert(
        "fire".to_string(),
        job.fire_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    // 执行尚未结束时时长为空
    let duration = match (job.execute.start_time, job.execute.end_time) {
        (Some(start), Some(end)) => format!("{}ms", (end - start).num_milliseconds()),
        _ => String::new(),
    };
    vars.insert("duration".to_string(), duration);
    vars.insert(
        "args".to_string(),
        job.args
            .iter()
            .map(|a| format!("{}={}", a.name, a.value))
            .collect::<Vec<_>>()
            .join(","),
    );
    vars.insert("error".to_string(), info.to_string());
    vars
}

fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

const DEFAULT_TITLE: &str = "任务告警: {{task}}";
const DEFAULT_BODY: &str = "作业 {{job}}（任务 {{task}}，{{mode}}模式）失败: {{error}}";

/// 固定变体的告警通道集合
pub enum AlertChannel {
    Webhook(WebhookChannel),
    Log,
}

impl AlertChannel {
    /// 任务alerts字段里引用的通道名
    pub fn name(&self) -> &'static str {
        match self {
            AlertChannel::Webhook(_) => "webhook",
            AlertChannel::Log => "log",
        }
    }

    pub async fn send(
        &self,
        options: &Args,
        users: &[User],
        vars: &HashMap<String, String>,
    ) -> SchedulerResult<()> {
        match self {
            AlertChannel::Webhook(channel) => channel.send(options, users, vars).await,
            AlertChannel::Log => {
                info!(
                    task = vars.get("task").map(String::as_str).unwrap_or(""),
                    job = vars.get("job").map(String::as_str).unwrap_or(""),
                    error = vars.get("error").map(String::as_str).unwrap_or(""),
                    "任务告警"
                );
                Ok(())
            }
        }
    }
}

/// 通用webhook通道，向配置的url POST一段JSON
pub struct WebhookChannel {
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(timeout: Duration) -> SchedulerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SchedulerError::Configuration(format!("构建HTTP客户端失败: {e}")))?;
        Ok(Self { client })
    }

    async fn send(
        &self,
        options: &Args,
        users: &[User],
        vars: &HashMap<String, String>,
    ) -> SchedulerResult<()> {
        let url = options
            .get("url")
            .ok_or_else(|| SchedulerError::Configuration("webhook通道缺少url配置".to_string()))?;

        let title = render(options.get("title").unwrap_or(DEFAULT_TITLE), vars);
        let body = render(options.get("body").unwrap_or(DEFAULT_BODY), vars);
        let mentions: Vec<&str> = users
            .iter()
            .map(|u| if u.im.is_empty() { u.name.as_str() } else { u.im.as_str() })
            .collect();

        let payload = serde_json::json!({
            "title": title,
            "text": body,
            "mentions": mentions,
        });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SchedulerError::network_error(format!("webhook请求失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchedulerError::network_error(format!(
                "webhook返回状态 {status}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskfire_domain::Args;

    #[test]
    fn test_render_substitutes_known_vars() {
        let mut vars = HashMap::new();
        vars.insert("task".to_string(), "t1".to_string());
        vars.insert("error".to_string(), "boom".to_string());

        let out = render("任务 {{task}} 失败: {{error}} ({{unknown}})", &vars);
        assert_eq!(out, "任务 t1 失败: boom ({{unknown}})");
    }

    #[test]
    fn test_build_vars_duration_empty_until_finished() {
        let task = Task::new("t1", "http://runner1", "Report", vec![]);
        let mut job = Job::new(&task, "node1", Args::new(), JobMode::Auto, Utc::now());

        let vars = build_vars(&job, &task, "boom");
        assert_eq!(vars.get("duration").map(String::as_str), Some(""));
        assert_eq!(vars.get("error").map(String::as_str), Some("boom"));

        let start = Utc::now();
        job.execute.start_time = Some(start);
        job.execute.end_time = Some(start + chrono::Duration::milliseconds(1500));
        let vars = build_vars(&job, &task, "boom");
        assert_eq!(vars.get("duration").map(String::as_str), Some("1500ms"));
    }
}
