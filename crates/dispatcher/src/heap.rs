//! 按触发时刻排序的任务最小堆
//!
//! 堆只被调度循环单线程访问，无并发保护。派发后根节点原位
//! 重算触发时刻，`update(0)`恢复堆序，不做弹出再插入。

use chrono::{DateTime, Utc};
use taskfire_domain::{SchedulerResult, Task};
use tracing::warn;

use crate::trigger::TriggerSet;

/// 堆元素：任务快照、编译后的触发器与下一次触发时刻
#[derive(Debug, Clone)]
pub struct TaskItem {
    pub task: Task,
    pub triggers: TriggerSet,
    pub fire: DateTime<Utc>,
}

impl TaskItem {
    pub fn new(task: Task, now: DateTime<Utc>) -> SchedulerResult<Self> {
        let triggers = TriggerSet::compile(&task.triggers)?;
        let fire = triggers.next(now);
        Ok(Self {
            task,
            triggers,
            fire,
        })
    }
}

#[derive(Debug, Default)]
pub struct TaskHeap {
    items: Vec<TaskItem>,
}

impl TaskHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(n)建堆；cron编译失败的任务记日志后跳过，不影响其他任务
    pub fn from_tasks(tasks: Vec<Task>, now: DateTime<Utc>) -> Self {
        let mut items = Vec::with_capacity(tasks.len());
        for task in tasks {
            let name = task.name.clone();
            match TaskItem::new(task, now) {
                Ok(item) => items.push(item),
                Err(e) => warn!(task = %name, "任务触发器编译失败，跳过调度: {e}"),
            }
        }

        let mut heap = Self { items };
        if heap.items.len() > 1 {
            for i in (0..heap.items.len() / 2).rev() {
                heap.down(i);
            }
        }
        heap
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek(&self) -> Option<&TaskItem> {
        self.items.first()
    }

    pub fn push(&mut self, item: TaskItem) {
        self.items.push(item);
        self.up(self.items.len() - 1);
    }

    pub fn pop(&mut self) -> Option<TaskItem> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let item = self.items.pop();
        if !self.items.is_empty() {
            self.down(0);
        }
        item
    }

    /// index处的触发时刻变化后恢复堆序
    pub fn update(&mut self, index: usize) {
        if index >= self.items.len() {
            return;
        }
        if !self.down(index) {
            self.up(index);
        }
    }

    /// 重算根节点的下一次触发时刻并恢复堆序，派发后调用
    pub fn reschedule_top(&mut self, now: DateTime<Utc>) {
        if let Some(item) = self.items.first_mut() {
            item.fire = item.triggers.next(now);
            self.update(0);
        }
    }

    fn up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.items[i].fire >= self.items[parent].fire {
                break;
            }
            self.items.swap(i, parent);
            i = parent;
        }
    }

    fn down(&mut self, mut i: usize) -> bool {
        let start = i;
        let len = self.items.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < len && self.items[right].fire < self.items[left].fire {
                child = right;
            }
            if self.items[child].fire >= self.items[i].fire {
                break;
            }
            self.items.swap(i, child);
            i = child;
        }
        i != start
    }
}
