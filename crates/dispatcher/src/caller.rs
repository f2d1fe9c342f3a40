//! 远程派发调用
//!
//! 按协议名注册的调用器集合，启动时构建，运行期不再扩展。
//! HTTP调用器对候选地址做均匀洗牌后逐个尝试，地址级故障转移。

use std::collections::HashMap;
use std::time::Duration;

use rand::seq::SliceRandom;
use taskfire_domain::{CallResult, JobPayload, SchedulerError, SchedulerResult};
use tracing::debug;

/// 固定变体的调用器，协议扩展新增变体即可
pub enum Caller {
    Http(HttpCaller),
}

impl Caller {
    pub async fn call(&self, addresses: &[String], payload: &JobPayload) -> CallResult {
        match self {
            Caller::Http(caller) => caller.call(addresses, payload).await,
        }
    }
}

/// 协议名到调用器的映射，启动时根据配置构建
pub struct CallerRegistry {
    callers: HashMap<String, Caller>,
}

impl CallerRegistry {
    /// 带默认http条目的注册表
    pub fn new(call_timeout: Duration) -> SchedulerResult<Self> {
        let mut callers = HashMap::new();
        callers.insert(
            "http".to_string(),
            Caller::Http(HttpCaller::new(call_timeout)?),
        );
        Ok(Self { callers })
    }

    pub fn get(&self, scheme: &str) -> SchedulerResult<&Caller> {
        self.callers
            .get(scheme)
            .ok_or_else(|| SchedulerError::CallerNotFound(scheme.to_string()))
    }
}

pub struct HttpCaller {
    client: reqwest::Client,
}

impl HttpCaller {
    pub fn new(timeout: Duration) -> SchedulerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SchedulerError::Configuration(format!("构建HTTP客户端失败: {e}")))?;
        Ok(Self { client })
    }

    /// 洗牌后逐地址尝试，任一成功立即返回；失败应答与传输故障
    /// 都转移到下一地址，全部失败时返回最后一次失败
    pub async fn call(&self, addresses: &[String], payload: &JobPayload) -> CallResult {
        let mut candidates: Vec<&String> = addresses.iter().collect();
        {
            let mut rng = rand::rng();
            candidates.shuffle(&mut rng);
        }

        let mut last = CallResult::fail("没有可用的执行器地址");
        for address in candidates {
            match self.post(address, payload).await {
                Ok(result) if result.success() => return result,
                Ok(result) => {
                    debug!(address = %address, "执行器应答失败: {}", result.info);
                    last = result;
                }
                Err(info) => {
                    debug!(address = %address, "执行器调用失败: {info}");
                    last = CallResult::fail(info);
                }
            }
        }
        last
    }

    async fn post(&self, address: &str, payload: &JobPayload) -> Result<CallResult, String> {
        let url = format!("{address}/task/execute");
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| format!("请求 {url} 失败: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{url} 返回状态 {status}"));
        }
        response
            .json::<CallResult>()
            .await
            .map_err(|e| format!("解析 {url} 应答失败: {e}"))
    }
}
