//! 分布式锁端口
//!
//! 多个调度节点对同一触发时刻的任务竞争加锁，加锁失败即视为
//! 其他节点已派发，静默跳过。锁操作永不报错，失败按false处理。

use async_trait::async_trait;

/// 分布式锁：同一(任务, 触发毫秒)只有第一个加锁者成功
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// 返回false表示锁已被其他节点持有
    async fn lock(&self, task: &str, fire: i64) -> bool;

    async fn unlock(&self, task: &str, fire: i64) -> bool;
}

/// 空锁，单节点部署时使用，任何加锁请求都成功
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLock;

#[async_trait]
impl DistributedLock for NullLock {
    async fn lock(&self, _task: &str, _fire: i64) -> bool {
        true
    }

    async fn unlock(&self, _task: &str, _fire: i64) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_lock_always_succeeds() {
        let lock = NullLock;
        assert!(lock.lock("demo", 0).await);
        assert!(lock.lock("demo", 0).await);
        assert!(lock.unlock("demo", 0).await);
    }
}
