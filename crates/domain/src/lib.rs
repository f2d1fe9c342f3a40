pub mod contract;
pub mod errors;
pub mod lock;
pub mod models;
pub mod repositories;

pub use contract::{
    Batch, CallResult, ExecuteParam, JobPayload, NotifyParam, ResultCode, SplitResult,
};
pub use errors::{SchedulerError, SchedulerResult};
pub use lock::{DistributedLock, NullLock};
pub use models::{
    Arg, Args, DispatchOutcome, ExecuteOutcome, Job, JobMode, OutcomeStatus, Task, User,
};
pub use repositories::{ConfigRepository, JobRepository, TaskRepository, TaskState, UserRepository};
