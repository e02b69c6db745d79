//! Scheduled maintenance for webfm.
//!
//! This crate provides:
//! - A job executor that dispatches a job type to its handler
//! - A cron scheduler that triggers jobs on their schedules
//! - Built-in jobs for trash retention and abandoned upload cleanup

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use scheduler::CronScheduler;
