//! CLI command handlers, one file per command.

mod cache;
mod import_traffic;
mod run;

pub use cache::{run_cache_status, run_clear_cache};
pub use import_traffic::run_import_traffic;
pub use run::{run_pass, RunArgs};
