pub mod broker;
pub mod config;
pub mod error;
pub mod mount;
pub mod search;
pub mod shutdown;
pub mod task;
pub mod worker;
