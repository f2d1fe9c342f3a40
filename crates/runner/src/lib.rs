pub mod executor;
pub mod handlers;
pub mod notifier;
pub mod routes;

pub use executor::{Executor, Handler};
pub use handlers::{HandlerFn, ShellHandler};
pub use notifier::{HttpNotifier, ResultNotifier};
pub use routes::router;
