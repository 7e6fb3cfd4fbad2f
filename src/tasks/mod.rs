//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Reaps expired entries from every cache tier

mod cleanup;

pub use cleanup::spawn_cleanup_task;
