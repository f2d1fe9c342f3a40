//! 进程内存储实现
//!
//! 以RwLock<HashMap>承载四类仓储端口，供单机部署、演示与集成测试使用。
//! 外部存储（数据库等）可按同样的端口另行实现。

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use taskfire_domain::{
    Args, ConfigRepository, Job, JobRepository, SchedulerError, SchedulerResult, Task,
    TaskRepository, TaskState, User, UserRepository,
};

/// 任务仓储的内存实现
#[derive(Debug, Default)]
pub struct MemoryTaskRepository {
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let repo = Self::new();
        for task in tasks {
            repo.save(task);
        }
        repo
    }

    /// 写入或更新任务，供演示装载与测试编排使用
    pub fn save(&self, task: Task) {
        let mut guard = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(task.name.clone(), task);
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut guard = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        guard.remove(name).is_some()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn find(&self, name: &str) -> SchedulerResult<Option<Task>> {
        let guard = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(name).cloned())
    }

    async fn fetch_enabled(&self) -> SchedulerResult<Vec<Task>> {
        let guard = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.values().filter(|t| t.enabled).cloned().collect())
    }

    async fn get_state(&self) -> SchedulerResult<TaskState> {
        let guard = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        let enabled = guard.values().filter(|t| t.enabled);
        let mut state = TaskState::default();
        for task in enabled {
            state.count += 1;
            if state.modify_time.map_or(true, |t| task.modify_time > t) {
                state.modify_time = Some(task.modify_time);
            }
        }
        Ok(state)
    }
}

/// 作业仓储的内存实现
#[derive(Debug, Default)]
pub struct MemoryJobRepository {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let guard = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn find(&self, id: &str) -> SchedulerResult<Option<Job>> {
        let guard = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(id).cloned())
    }

    async fn create(&self, job: &Job) -> SchedulerResult<()> {
        let mut guard = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn modify_dispatch(&self, job: &Job) -> SchedulerResult<()> {
        let mut guard = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        match guard.get_mut(&job.id) {
            Some(stored) => {
                stored.dispatch = job.dispatch.clone();
                Ok(())
            }
            None => Err(SchedulerError::job_not_found(&job.id)),
        }
    }

    async fn modify_execute(&self, job: &Job) -> SchedulerResult<()> {
        let mut guard = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        match guard.get_mut(&job.id) {
            Some(stored) => {
                stored.execute = job.execute.clone();
                Ok(())
            }
            None => Err(SchedulerError::job_not_found(&job.id)),
        }
    }
}

/// 用户仓储的内存实现
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, user: User) {
        let mut guard = self.users.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn fetch(&self, ids: &[String]) -> SchedulerResult<Vec<User>> {
        let guard = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }
}

/// 系统配置仓储的内存实现，按键存放参数组
#[derive(Debug, Default)]
pub struct MemoryConfigRepository {
    entries: RwLock<HashMap<String, Args>>,
}

impl MemoryConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save<K: Into<String>>(&self, key: K, args: Args) {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.into(), args);
    }
}

#[async_trait]
impl ConfigRepository for MemoryConfigRepository {
    async fn find(&self, key: &str) -> SchedulerResult<Args> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use taskfire_domain::{JobMode, Task};

    fn sample_task(name: &str, enabled: bool) -> Task {
        let mut task = Task::new(name, "http://runner1:8001", "Demo", vec![]);
        task.enabled = enabled;
        task
    }

    #[tokio::test]
    async fn test_task_state_tracks_enabled_only() {
        let repo = MemoryTaskRepository::new();
        let mut early = sample_task("t1", true);
        early.modify_time = Utc::now() - Duration::hours(1);
        let late = sample_task("t2", true);
        let disabled = sample_task("t3", false);
        let late_time = late.modify_time;

        repo.save(early);
        repo.save(late);
        repo.save(disabled);

        let state = repo.get_state().await.unwrap();
        assert_eq!(state.count, 2);
        assert_eq!(state.modify_time, Some(late_time));

        let enabled = repo.fetch_enabled().await.unwrap();
        assert_eq!(enabled.len(), 2);
    }

    #[tokio::test]
    async fn test_job_modify_requires_existing_record() {
        let repo = MemoryJobRepository::new();
        let task = sample_task("t1", true);
        let job = Job::new(&task, "node1", Args::new(), JobMode::Auto, Utc::now());

        assert!(repo.modify_dispatch(&job).await.is_err());

        repo.create(&job).await.unwrap();
        repo.modify_dispatch(&job).await.unwrap();
        assert_eq!(repo.len(), 1);

        let found = repo.find(&job.id).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_config_find_missing_key_is_empty() {
        let repo = MemoryConfigRepository::new();
        let args = repo.find("alert.webhook").await.unwrap();
        assert!(args.is_empty());

        repo.save("alert.webhook", Args::from([("url", "http://hook")]));
        let args = repo.find("alert.webhook").await.unwrap();
        assert_eq!(args.get("url"), Some("http://hook"));
    }
}
