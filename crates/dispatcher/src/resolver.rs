use taskfire_domain::{SchedulerError, SchedulerResult};

/// 执行器地址解析器
///
/// Direct把任务的runner字段当作 `scheme://地址[,地址…]` 字面量，
/// 服务发现类解析器是预留的扩展位。
#[derive(Debug, Clone, Copy, Default)]
pub enum Resolver {
    #[default]
    Direct,
}

impl Resolver {
    /// 返回协议名与候选地址列表（地址带协议前缀）
    pub fn resolve(&self, runner: &str) -> SchedulerResult<(String, Vec<String>)> {
        match self {
            Resolver::Direct => {
                let (scheme, rest) = runner.split_once("://").ok_or_else(|| {
                    SchedulerError::Configuration(format!("无效的执行器地址: {runner}"))
                })?;
                if scheme.is_empty() || rest.is_empty() {
                    return Err(SchedulerError::Configuration(format!(
                        "无效的执行器地址: {runner}"
                    )));
                }
                let addresses: Vec<String> = rest
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(|a| format!("{scheme}://{a}"))
                    .collect();
                Ok((scheme.to_string(), addresses))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_single_address() {
        let (scheme, addrs) = Resolver::Direct.resolve("http://runner1:8001").unwrap();
        assert_eq!(scheme, "http");
        assert_eq!(addrs, vec!["http://runner1:8001"]);
    }

    #[test]
    fn test_resolve_multiple_addresses() {
        let (scheme, addrs) = Resolver::Direct
            .resolve("http://runner1:8001, runner2:8001")
            .unwrap();
        assert_eq!(scheme, "http");
        assert_eq!(addrs, vec!["http://runner1:8001", "http://runner2:8001"]);
    }

    #[test]
    fn test_resolve_missing_scheme_is_configuration_error() {
        assert!(Resolver::Direct.resolve("runner1:8001").is_err());
        assert!(Resolver::Direct.resolve("http://").is_err());
    }
}
