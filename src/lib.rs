pub mod config;
pub mod control;
pub mod dashboard;
pub mod drive;
pub mod messages;
pub mod performance;
pub mod robot;
pub mod runtime;
pub mod stats;
