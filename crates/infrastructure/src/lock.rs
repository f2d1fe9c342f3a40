//! 进程内分布式锁实现
//!
//! 语义与外部锁一致：同一触发时刻只有第一个加锁者成功，持有期满
//! 后自动过期。仅覆盖单进程多调度器的测试与演示场景。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use taskfire_domain::DistributedLock;

/// 锁的持有时长，足够覆盖一次派发往返
const LOCK_TTL: Duration = Duration::from_secs(5 * 60);

fn lock_key(task: &str, fire: i64) -> String {
    format!("task:{task}:{fire}")
}

#[derive(Debug, Default)]
pub struct MemoryLock {
    held: Mutex<HashMap<String, Instant>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for MemoryLock {
    async fn lock(&self, task: &str, fire: i64) -> bool {
        let key = lock_key(task, fire);
        let mut guard = self.held.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        guard.retain(|_, acquired| now.duration_since(*acquired) < LOCK_TTL);

        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, now);
        true
    }

    async fn unlock(&self, task: &str, fire: i64) -> bool {
        let mut guard = self.held.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&lock_key(task, fire)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_lock_on_same_fire_fails() {
        let lock = MemoryLock::new();
        assert!(lock.lock("demo", 1_700_000_000_000).await);
        assert!(!lock.lock("demo", 1_700_000_000_000).await);
        // 其他触发时刻不受影响
        assert!(lock.lock("demo", 1_700_000_060_000).await);
        // 其他任务不受影响
        assert!(lock.lock("other", 1_700_000_000_000).await);
    }

    #[tokio::test]
    async fn test_unlock_releases_key() {
        let lock = MemoryLock::new();
        assert!(lock.lock("demo", 0).await);
        assert!(lock.unlock("demo", 0).await);
        assert!(!lock.unlock("demo", 0).await);
        assert!(lock.lock("demo", 0).await);
    }
}
