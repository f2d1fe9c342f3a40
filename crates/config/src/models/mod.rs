pub mod app_config;
pub mod dispatcher_runner;
pub mod logging;

pub use app_config::*;
pub use dispatcher_runner::*;
pub use logging::*;
