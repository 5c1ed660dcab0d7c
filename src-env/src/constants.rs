/// Environment variable overriding where monitor CSV files are written
pub const RECORDS_DIR_VAR: &str = "EVOSOLVE_RECORDS_DIR";

/// Environment variable enabling per-phase timing logs in the DE loop
pub const TIMING_VAR: &str = "EVOSOLVE_DE_TIMING";

/// Environment variable holding the `env_logger` filter for the binaries
pub const LOG_VAR: &str = "EVOSOLVE_LOG";

/// Records directory used when `EVOSOLVE_RECORDS_DIR` is unset
pub const DEFAULT_RECORDS_DIR: &str = "./data_generated/records";

/// Log filter used when `EVOSOLVE_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";
