//! Data quality checks over a loaded table.
//!
//! Checks are informational: a failed verdict never stops a cleaning run.
//! The one fatal condition, duplicate column names, is raised while loading.

mod validator;

pub use validator::DatasetValidator;
