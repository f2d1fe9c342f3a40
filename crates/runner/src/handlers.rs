//! 内置处理器与适配器

use std::future::Future;

use async_trait::async_trait;
use taskfire_domain::{JobPayload, SchedulerError, SchedulerResult};
use tracing::debug;

use crate::executor::Handler;

/// 闭包处理器适配器
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(JobPayload) -> Fut + Send + Sync,
    Fut: Future<Output = SchedulerResult<()>> + Send,
{
    async fn handle(&self, job: &JobPayload) -> SchedulerResult<()> {
        (self.f)(job.clone()).await
    }
}

/// 内置shell处理器：执行作业参数cmd指定的命令
///
/// 可选参数workdir指定工作目录。非零退出码按失败处理，stderr
/// 尾部进入错误信息。
pub struct ShellHandler;

#[async_trait]
impl Handler for ShellHandler {
    async fn handle(&self, job: &JobPayload) -> SchedulerResult<()> {
        let cmd = job
            .args
            .get("cmd")
            .ok_or_else(|| SchedulerError::Execution("shell任务缺少cmd参数".to_string()))?;

        let mut command = tokio::process::Command::new("sh");
        command.arg("-c").arg(cmd);
        if let Some(workdir) = job.args.get("workdir") {
            command.current_dir(workdir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| SchedulerError::Execution(format!("启动命令失败: {e}")))?;

        if output.status.success() {
            debug!(job = %job.id, "命令执行成功");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(SchedulerError::Execution(format!(
                "命令退出码 {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskfire_domain::{Args, Job, JobMode, Task};

    fn shell_job(args: Args) -> JobPayload {
        let mut task = Task::new("shell-task", "http://runner1", "Shell", vec![]);
        task.args = args;
        JobPayload::from(&Job::new(
            &task,
            "node1",
            Args::new(),
            JobMode::Manual,
            Utc::now(),
        ))
    }

    #[tokio::test]
    async fn test_shell_handler_success() {
        let job = shell_job(Args::from([("cmd", "true")]));
        assert!(ShellHandler.handle(&job).await.is_ok());
    }

    #[tokio::test]
    async fn test_shell_handler_nonzero_exit_fails() {
        let job = shell_job(Args::from([("cmd", "echo oops >&2; exit 3")]));
        let err = ShellHandler.handle(&job).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains('3'));
        assert!(text.contains("oops"));
    }

    #[tokio::test]
    async fn test_shell_handler_missing_cmd() {
        let job = shell_job(Args::new());
        assert!(ShellHandler.handle(&job).await.is_err());
    }

    #[tokio::test]
    async fn test_handler_fn_adapter() {
        let handler = HandlerFn::new(|job: JobPayload| async move {
            if job.args.get("flag").is_some() {
                Ok(())
            } else {
                Err(SchedulerError::Execution("missing flag".to_string()))
            }
        });

        let ok = shell_job(Args::from([("flag", "1")]));
        assert!(handler.handle(&ok).await.is_ok());

        let bad = shell_job(Args::new());
        assert!(handler.handle(&bad).await.is_err());
    }
}
