// daemon/src/lib.rs
pub mod daemon;

pub use daemon::scheduler::ResourceScheduler;
pub use daemon::task::{TaskArgs, TaskContext};
