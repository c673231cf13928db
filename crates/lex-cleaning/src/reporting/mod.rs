//! Before/after metrics of a cleaning run.
//!
//! [`StatsComputer`] is a pure function of the original and transformed
//! tables. It never fails: a column it cannot read simply contributes no
//! missing count.

mod stats;

pub use stats::StatsComputer;
