// core/src/error.rs
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    /// A quota is currently violated; callers should back off.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Sustained overload tripped the breaker; callers should not retry immediately.
    #[error("circuit breaker is open")]
    CircuitBreakerOpen,

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler is not running")]
    NotRunning,
}
