//! WorkerPick - per-topic worker selection for partitioned producers
//!
//! For every publish request a producer must decide which downstream worker
//! (a connection able to deliver to one partition or broker) receives it.
//! WorkerPick answers that question without blocking the publish path on
//! pool provisioning.
//!
//! # Core Concepts
//!
//! - **One coordinator per topic**: a Tokio task owns all selection state
//! - **Cached vs authoritative**: async picks answer from cached state,
//!   sync picks always ask the lookup service
//! - **Reconciliation**: a self-rearming timer re-derives the worker and
//!   refreshes the rotation queue from the membership registry
//! - **Failures are data**: unregistered or warming pools come back as
//!   retryable errors, never as crashes
//!
//! # Modules
//!
//! - [`coordinator`] - Coordinator task, handle and messages
//! - [`selector`] - Selection policies and reconciliation
//! - [`pool`] - Lookup, membership and bootstrap collaborators
//! - [`router`] - Per-topic coordinator management
//! - [`config`] - Configuration types and loading

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod pool;
pub mod router;
pub mod selector;
pub mod telemetry;

// Re-export commonly used types
pub use config::{Config, TopicOverrides, TopicSettings};
pub use coordinator::{
    CoordRequest, Coordinator, CoordinatorConfig, CoordinatorHandle, PickCallback, PickMode, Setting,
};
pub use domain::{Assignment, Resolution, Strategy, Topic, WorkerHandle};
pub use error::{PickError, Selection};
pub use pool::{Bootstrapper, InMemoryPool, LookupService, MembershipRegistry, PoolServices};
pub use router::TopicRouter;
pub use selector::{CoordinatorInfo, CoordinatorMetrics, CoordinatorState, TickReport};
