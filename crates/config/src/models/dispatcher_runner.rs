use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

/// 执行器地址的解析方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// 任务的runner字段即 `scheme://地址列表`
    #[default]
    Direct,
}

/// 分布式锁实现
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// 空锁，单节点部署
    #[default]
    Null,
    /// 进程内锁，测试与演示用
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub enabled: bool,
    /// 任务指纹轮询间隔
    pub fetch_interval_seconds: u64,
    /// 派发到执行器的HTTP超时
    pub call_timeout_seconds: u64,
    pub resolver: ResolverKind,
    pub lock: LockKind,
}

impl ConfigValidator for DispatcherConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_timeout_seconds(
            self.fetch_interval_seconds,
            "dispatcher.fetch_interval_seconds",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.call_timeout_seconds,
            "dispatcher.call_timeout_seconds",
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub enabled: bool,
    pub bind_address: String,
    /// 结果通知回传的调度器地址，形如 `http://scheduler:8000`
    pub scheduler_address: String,
    pub notify_timeout_seconds: u64,
}

impl ConfigValidator for RunnerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        ValidationUtils::validate_bind_address(&self.bind_address, "runner.bind_address")?;
        ValidationUtils::validate_not_empty(&self.scheduler_address, "runner.scheduler_address")?;
        ValidationUtils::validate_timeout_seconds(
            self.notify_timeout_seconds,
            "runner.notify_timeout_seconds",
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub cors_enabled: bool,
}

impl ConfigValidator for ApiConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        ValidationUtils::validate_bind_address(&self.bind_address, "api.bind_address")
    }
}
