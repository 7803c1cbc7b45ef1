//! Worker selection logic
//!
//! Two selection paths share one state type and are never blended:
//! - **Cached:** answer from the current worker or rotation queue, no I/O
//! - **Authoritative:** ask the lookup service and adopt its answer
//!
//! The reconciliation pass keeps the cache honest on a timer.

mod authoritative;
mod policy;
mod reconcile;
mod state;

pub use authoritative::pick_authoritative;
pub use policy::select_cached;
pub use reconcile::{TickReport, reconcile, refresh_queue, should_force_pick};
pub use state::{CoordinatorInfo, CoordinatorMetrics, CoordinatorState};
