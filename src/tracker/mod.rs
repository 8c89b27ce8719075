//! Project time tracking core.
//!
//!  - [store::TimeTrackingStore] owns projects and time entries and allows at most one running
//!    timer.
//!  - Stopping a timer is the only way a [entities::TimeEntry] comes into existence.
//!  - [stats] derives daily aggregates from entries, [refresh::Ticker] drives live redraws.

pub mod entities;
pub mod refresh;
pub mod stats;
pub mod store;
