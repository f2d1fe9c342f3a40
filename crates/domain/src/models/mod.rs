mod args;
mod job;
mod task;
mod user;

pub use args::{Arg, Args};
pub use job::{DispatchOutcome, ExecuteOutcome, Job, JobMode, OutcomeStatus};
pub use task::Task;
pub use user::User;
