pub mod adb;
#[cfg(feature = "gui")]
pub mod commands;
pub mod config;
pub mod error;
pub mod invocation;
pub mod logging;
pub mod models;
pub mod operations;
pub mod output;
pub mod panel;
pub mod scheduler;
#[cfg(feature = "gui")]
pub mod state;
