pub mod alerter;
pub mod caller;
pub mod fetcher;
pub mod heap;
pub mod resolver;
pub mod scheduler;
pub mod trigger;

pub use alerter::{AlertChannel, Alerter, WebhookChannel};
pub use caller::{Caller, CallerRegistry, HttpCaller};
pub use fetcher::TaskFetcher;
pub use heap::{TaskHeap, TaskItem};
pub use resolver::Resolver;
pub use scheduler::Scheduler;
pub use trigger::TriggerSet;
