pub mod auth;
pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod report;
pub mod retry;
pub mod run;
pub mod summary;
