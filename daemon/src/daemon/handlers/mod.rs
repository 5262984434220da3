// daemon/src/daemon/handlers/mod.rs
pub mod stats_handler;
pub mod submit_handler;
pub mod task_handler;

pub use stats_handler::handle_stats_command;
pub use submit_handler::handle_submit_command;
pub use task_handler::handle_task_command;
