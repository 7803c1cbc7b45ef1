//! Worker pool collaborators
//!
//! The coordinator never talks to brokers itself. It depends on three
//! external services, each behind a trait so they can be swapped:
//! - **LookupService:** resolves a topic + strategy to a ready worker
//! - **MembershipRegistry:** reports which workers currently exist for a topic
//! - **Bootstrapper:** provisions a topic's worker pool (idempotent, fire-and-forget)

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::domain::{Resolution, Strategy, Topic, WorkerHandle};

/// Authoritative topic -> worker resolution
///
/// Must be safe to call repeatedly and concurrently from many coordinators.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn resolve(&self, topic: &Topic, strategy: Strategy) -> Resolution;
}

/// Eventually consistent view of a topic's workers
///
/// May return an empty list before bootstrap completes.
#[async_trait]
pub trait MembershipRegistry: Send + Sync {
    async fn members(&self, topic: &Topic) -> Vec<WorkerHandle>;
}

/// Provisions the worker pool for a topic
///
/// Implementations must not block: hand the work off and return.
pub trait Bootstrapper: Send + Sync {
    fn provision(&self, topic: &Topic);
}

/// The collaborator set a coordinator is wired to
#[derive(Clone)]
pub struct PoolServices {
    pub lookup: Arc<dyn LookupService>,
    pub registry: Arc<dyn MembershipRegistry>,
    pub bootstrap: Arc<dyn Bootstrapper>,
}

impl PoolServices {
    pub fn new(
        lookup: Arc<dyn LookupService>,
        registry: Arc<dyn MembershipRegistry>,
        bootstrap: Arc<dyn Bootstrapper>,
    ) -> Self {
        Self {
            lookup,
            registry,
            bootstrap,
        }
    }

    /// Wire all three roles to the same in-memory pool
    pub fn in_memory(pool: Arc<InMemoryPool>) -> Self {
        Self {
            lookup: pool.clone(),
            registry: pool.clone(),
            bootstrap: pool,
        }
    }
}

/// One topic's members plus its round-robin cursor
#[derive(Debug, Default)]
struct TopicPool {
    members: Vec<WorkerHandle>,
    cursor: usize,
}

impl TopicPool {
    fn with_members(members: Vec<WorkerHandle>) -> Self {
        Self { members, cursor: 0 }
    }

    /// Member at the cursor, then advance it
    fn next_in_turn(&mut self) -> WorkerHandle {
        let idx = self.cursor % self.members.len();
        self.cursor = (idx + 1) % self.members.len();
        self.members[idx].clone()
    }
}

/// In-process worker pool keyed by topic name
///
/// A topic is "registered" once it has an entry, even with no members.
/// Round-robin resolves walk each topic's members in order.
#[derive(Debug, Default)]
pub struct InMemoryPool {
    topics: RwLock<HashMap<String, TopicPool>>,
    provisioned: AtomicUsize,
}

impl InMemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic with the given members, replacing any previous list
    pub fn register(&self, topic: &str, members: Vec<WorkerHandle>) {
        debug!(%topic, member_count = members.len(), "InMemoryPool::register: called");
        match self.topics.write() {
            Ok(mut topics) => {
                topics.insert(topic.to_string(), TopicPool::with_members(members));
            }
            Err(_) => warn!(%topic, "InMemoryPool lock poisoned, register dropped"),
        }
    }

    /// Add a worker to a topic, registering the topic if needed
    pub fn add_member(&self, topic: &str, worker: WorkerHandle) {
        debug!(%topic, %worker, "InMemoryPool::add_member: called");
        if let Ok(mut topics) = self.topics.write() {
            let pool = topics.entry(topic.to_string()).or_default();
            if !pool.members.contains(&worker) {
                pool.members.push(worker);
            }
        }
    }

    /// Remove a worker from a topic
    pub fn remove_member(&self, topic: &str, worker: &WorkerHandle) {
        debug!(%topic, %worker, "InMemoryPool::remove_member: called");
        if let Ok(mut topics) = self.topics.write()
            && let Some(pool) = topics.get_mut(topic)
        {
            pool.members.retain(|m| m != worker);
        }
    }

    pub fn is_registered(&self, topic: &str) -> bool {
        self.topics.read().map(|t| t.contains_key(topic)).unwrap_or(false)
    }

    /// Number of provision calls received
    pub fn provision_count(&self) -> usize {
        self.provisioned.load(Ordering::SeqCst)
    }

    fn snapshot(&self, topic: &Topic) -> Option<Vec<WorkerHandle>> {
        self.topics.read().ok()?.get(topic.as_str()).map(|pool| pool.members.clone())
    }
}

#[async_trait]
impl LookupService for InMemoryPool {
    async fn resolve(&self, topic: &Topic, strategy: Strategy) -> Resolution {
        debug!(%topic, %strategy, "InMemoryPool::resolve: called");
        let Ok(mut topics) = self.topics.write() else {
            warn!(%topic, "InMemoryPool lock poisoned, treating topic as unregistered");
            return Resolution::NotRegistered;
        };
        let Some(pool) = topics.get_mut(topic.as_str()) else {
            return Resolution::NotRegistered;
        };
        if pool.members.is_empty() {
            return Resolution::NotReady;
        }

        let worker = match strategy {
            Strategy::Random => pool.members[rand::rng().random_range(0..pool.members.len())].clone(),
            Strategy::StickyRoundRobin | Strategy::StrictRoundRobin => pool.next_in_turn(),
        };
        Resolution::Selected(worker)
    }
}

#[async_trait]
impl MembershipRegistry for InMemoryPool {
    async fn members(&self, topic: &Topic) -> Vec<WorkerHandle> {
        self.snapshot(topic).unwrap_or_default()
    }
}

impl Bootstrapper for InMemoryPool {
    fn provision(&self, topic: &Topic) {
        self.provisioned.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut topics) = self.topics.write()
            && !topics.contains_key(topic.as_str())
        {
            info!(%topic, "Provisioned worker pool");
            topics.insert(topic.as_str().to_string(), TopicPool::default());
        }
    }
}
