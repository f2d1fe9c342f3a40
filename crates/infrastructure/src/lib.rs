pub mod lock;
pub mod memory;

pub use lock::MemoryLock;
pub use memory::{
    MemoryConfigRepository, MemoryJobRepository, MemoryTaskRepository, MemoryUserRepository,
};
