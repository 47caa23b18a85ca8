// Host kernel entities as seen by the mediation layer.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, InodeId, Pid};

/// Longest filename carried in an access descriptor, in bytes.
pub const NAME_MAX: usize = 255;

/// A running task (the subject of every mediated call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Process id.
    pub pid: Pid,
    /// Thread-group id.
    pub tgid: Pid,
    /// Real user id.
    pub uid: u32,
    /// Effective user id.
    pub euid: u32,
    /// Real group id.
    pub gid: u32,
    /// Effective group id.
    pub egid: u32,
    /// Command name.
    pub comm: String,
}

impl Task {
    /// Cache key for this task's identity.
    pub fn entity_id(&self) -> EntityId {
        EntityId::Task(self.pid)
    }
}

/// An inode (the object of every mediated call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    /// Device number.
    pub dev: u64,
    /// Inode number.
    pub ino: u64,
    /// File mode bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Hard link count.
    pub nlink: u32,
}

impl Inode {
    /// Device plus inode number.
    pub fn id(&self) -> InodeId {
        InodeId {
            dev: self.dev,
            ino: self.ino,
        }
    }

    /// Cache key for this inode's identity.
    pub fn entity_id(&self) -> EntityId {
        EntityId::Inode(self.id())
    }
}

/// A directory entry bound to its inode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dentry {
    /// Last path component ("/" for a filesystem root).
    pub name: String,
    /// The inode the entry refers to.
    pub inode: Inode,
}

/// A mounted filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Name of the dentry the filesystem is mounted on.
    pub mountpoint: String,
    /// Root inode of the mounted filesystem.
    pub root: InodeId,
}

/// A dentry reached through a specific mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// The mount the dentry was reached through.
    pub mnt: Mount,
    /// The dentry itself.
    pub dentry: Dentry,
}

/// A filename bounded to [`NAME_MAX`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filename(String);

impl Filename {
    /// Copy `name`, truncating on a char boundary at [`NAME_MAX`] bytes.
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(NAME_MAX);
        while !name.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        Self(name.get(..end).unwrap_or_default().to_owned())
    }

    /// The bounded name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Plain name of a dentry.
pub fn dentry_name(dentry: &Dentry) -> Filename {
    Filename::new(&dentry.name)
}

/// Mount-aware name of a path: a mount root is named after its mount point.
pub fn dentry_name_mnt(path: &Path) -> Filename {
    if path.dentry.inode.id() == path.mnt.root {
        return Filename::new(&path.mnt.mountpoint);
    }
    dentry_name(&path.dentry)
}
