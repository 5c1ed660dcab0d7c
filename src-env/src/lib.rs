//! Environment utilities and constants shared by the evosolve crates.

pub mod constants;
pub mod env_utils;

pub use env_utils::{EnvError, log_filter, records_dir, timing_enabled};
