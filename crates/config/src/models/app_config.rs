use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::dispatcher_runner::{ApiConfig, DispatcherConfig, LockKind, ResolverKind, RunnerConfig};
use super::logging::{LogConfig, LogFormat};
use crate::validation::ConfigValidator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 节点标识，作业的scheduler字段会记录它
    pub node: String,
    pub dispatcher: DispatcherConfig,
    pub runner: RunnerConfig,
    pub api: ApiConfig,
    pub log: LogConfig,
}

fn default_node() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "taskfire".to_string())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node: default_node(),
            dispatcher: DispatcherConfig {
                enabled: true,
                fetch_interval_seconds: 60,
                call_timeout_seconds: 10,
                resolver: ResolverKind::Direct,
                lock: LockKind::Null,
            },
            runner: RunnerConfig {
                enabled: false,
                bind_address: "0.0.0.0:8001".to_string(),
                scheduler_address: "http://127.0.0.1:8000".to_string(),
                notify_timeout_seconds: 10,
            },
            api: ApiConfig {
                enabled: true,
                bind_address: "0.0.0.0:8000".to_string(),
                cors_enabled: true,
            },
            log: LogConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/taskfire.toml",
                "taskfire.toml",
                "/etc/taskfire/config.toml",
            ];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        builder = builder
            .set_default("node", default_node())?
            .set_default("dispatcher.enabled", true)?
            .set_default("dispatcher.fetch_interval_seconds", 60)?
            .set_default("dispatcher.call_timeout_seconds", 10)?
            .set_default("dispatcher.resolver", "direct")?
            .set_default("dispatcher.lock", "null")?
            .set_default("runner.enabled", false)?
            .set_default("runner.bind_address", "0.0.0.0:8001")?
            .set_default("runner.scheduler_address", "http://127.0.0.1:8000")?
            .set_default("runner.notify_timeout_seconds", 10)?
            .set_default("api.enabled", true)?
            .set_default("api.bind_address", "0.0.0.0:8000")?
            .set_default("api.cors_enabled", true)?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?;

        builder = builder.add_source(
            Environment::with_prefix("TASKFIRE")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate().map_err(anyhow::Error::from)?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate().map_err(anyhow::Error::from)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        crate::validation::ValidationUtils::validate_not_empty(&self.node, "node")?;
        self.dispatcher.validate()?;
        self.runner.validate()?;
        self.api.validate()?;
        self.log.validate()?;
        Ok(())
    }
}
