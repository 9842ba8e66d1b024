//! CLI command handlers.

pub mod enqueue;
pub mod info;
pub mod run;

pub use enqueue::run_enqueue;
pub use info::run_info;
pub use run::run_run;
