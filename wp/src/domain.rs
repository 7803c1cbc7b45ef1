//! Core domain types shared by every selection path

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Logical stream a coordinator is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Wildcard: no specific topic bound yet (catch-all coordinator)
    Any,
    /// A concrete topic name
    Named(String),
}

impl Topic {
    pub fn named(name: impl Into<String>) -> Self {
        Topic::Named(name.into())
    }

    /// Topic name, or `*` for the wildcard
    pub fn as_str(&self) -> &str {
        match self {
            Topic::Any => "*",
            Topic::Named(name) => name,
        }
    }

    /// Whether a pick addressed to `requested` may be served by a coordinator bound to `self`
    pub fn accepts(&self, requested: &Topic) -> bool {
        match (self, requested) {
            (Topic::Any, _) => true,
            (Topic::Named(bound), Topic::Named(name)) => bound == name,
            (Topic::Named(_), Topic::Any) => false,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        if name == "*" {
            Topic::Any
        } else {
            Topic::Named(name.to_string())
        }
    }
}

/// Opaque identifier of a downstream send target
///
/// The coordinator only compares and hashes handles; it never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerHandle(String);

impl WorkerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Load-balancing policy for a topic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Strategy {
    /// Answer from the current worker; no ordering guarantee between callers
    #[default]
    Random,
    /// Stay on the current worker until the sticky threshold is exceeded
    StickyRoundRobin,
    /// Rotate through the worker queue on every selection
    StrictRoundRobin,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::StickyRoundRobin => "sticky_round_robin",
            Strategy::StrictRoundRobin => "strict_round_robin",
        }
    }

    /// Parse a strategy name; unrecognized names fall back to the default policy
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim() {
            "random" => Strategy::Random,
            "sticky_round_robin" => Strategy::StickyRoundRobin,
            "strict_round_robin" => Strategy::StrictRoundRobin,
            other => {
                warn!(strategy = %other, "Unrecognized strategy, using random");
                Strategy::Random
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Strategy {
    fn from(name: String) -> Self {
        Strategy::parse_lenient(&name)
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.as_str().to_string()
    }
}

/// Whether a coordinator has a sticky default worker yet
///
/// Once `Assigned`, only the authoritative pick path may replace the worker;
/// explicit assignment is accepted only from `Unassigned`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Assignment {
    #[default]
    Unassigned,
    Assigned(WorkerHandle),
}

impl Assignment {
    pub fn worker(&self) -> Option<&WorkerHandle> {
        match self {
            Assignment::Unassigned => None,
            Assignment::Assigned(handle) => Some(handle),
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Assignment::Assigned(_))
    }
}

/// Answer from the lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A concrete worker is ready for the topic
    Selected(WorkerHandle),
    /// No pool exists for the topic yet
    NotRegistered,
    /// The pool exists but has no ready worker
    NotReady,
}
