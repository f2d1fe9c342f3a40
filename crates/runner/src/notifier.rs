use std::time::Duration;

use async_trait::async_trait;
use taskfire_domain::{NotifyParam, SchedulerError, SchedulerResult};

/// 执行结果通知端口，每次执行尝试恰好调用一次
#[async_trait]
pub trait ResultNotifier: Send + Sync {
    async fn notify(&self, param: NotifyParam) -> SchedulerResult<()>;
}

/// 向调度器的notify接口回传结果
pub struct HttpNotifier {
    client: reqwest::Client,
    scheduler_address: String,
}

impl HttpNotifier {
    pub fn new<S: Into<String>>(scheduler_address: S, timeout: Duration) -> SchedulerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SchedulerError::Configuration(format!("构建HTTP客户端失败: {e}")))?;
        Ok(Self {
            client,
            scheduler_address: scheduler_address.into(),
        })
    }
}

#[async_trait]
impl ResultNotifier for HttpNotifier {
    async fn notify(&self, param: NotifyParam) -> SchedulerResult<()> {
        let url = format!(
            "{}/api/task/notify",
            self.scheduler_address.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .json(&param)
            .send()
            .await
            .map_err(|e| SchedulerError::network_error(format!("通知请求失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchedulerError::network_error(format!(
                "通知接口返回状态 {status}"
            )));
        }
        Ok(())
    }
}
