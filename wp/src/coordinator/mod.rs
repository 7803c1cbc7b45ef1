//! Per-topic worker selection coordinator
//!
//! One Coordinator task runs per topic and answers two kinds of requests:
//! - **Pick:** which worker should this publish go to (sync or async)
//! - **Set:** runtime changes to worker, strategy, or sticky threshold
//!
//! A self-rearming timer reconciles the cached worker set with the pool.

mod config;
mod core;
mod handle;
mod messages;

pub use config::CoordinatorConfig;
pub use core::Coordinator;
pub use handle::CoordinatorHandle;
pub use messages::{CoordRequest, PickCallback, PickMode, Setting};
