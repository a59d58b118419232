//! Schedule to calendar synchronization.
//!
//! For every row: parse, build the weekly recurrence, derive the identity,
//! look the identity up remotely and create the event only when it is absent.

pub mod driver;
pub mod plan;
pub mod report;

pub use driver::SyncDriver;
pub use plan::{PlannedEvent, PlannedRow, Planner};
pub use report::{OutcomeKind, RowOutcome, SyncReport, SyncSummary};
