// Core types shared by every mediation step.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process identifier of a host task.
pub type Pid = i32;

/// Final answer of a mediated operation.
///
/// The hook caller enforces it; there is no partial or soft outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    /// The operation may proceed.
    Allow,
    /// The operation must be aborted by the caller.
    Deny,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

/// How the answer was reached. Recorded in audit only, never used for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    /// Virtual spaces intersect and the access type is not monitored.
    NoRequest,
    /// Denied by the virtual-space check without contacting the authority.
    FastPath,
    /// The decision authority was asked.
    Request,
}

/// Identity of an inode: device plus inode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InodeId {
    /// Device number of the filesystem holding the inode.
    pub dev: u64,
    /// Inode number within the device.
    pub ino: u64,
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}

/// Key under which a host entity's security identity is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityId {
    /// A task, keyed by pid.
    Task(Pid),
    /// An inode.
    Inode(InodeId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(pid) => write!(f, "task:{pid}"),
            Self::Inode(id) => write!(f, "inode:{id}"),
        }
    }
}
