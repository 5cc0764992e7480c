//! Background Tasks Module
//!
//! Long-running tokio tasks spawned at startup and aborted on shutdown.

mod dispatch;
mod sweep;

pub use dispatch::spawn_dispatch_task;
pub use sweep::spawn_sweep_task;
