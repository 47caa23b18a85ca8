// Object descriptor: a snapshot of the target inode.

use serde::Serialize;

use super::host::Inode;
use super::identity::SecurityContext;
use crate::registry::AccessMask;
use crate::schema::{AttrKind, AttrValue, Attribute, Schema};
use crate::types::InodeId;
use crate::vs::VirtualSpace;

const FILE_ATTRS: &[Attribute] = &[
    Attribute::read_only("dev", AttrKind::Unsigned),
    Attribute::read_only("ino", AttrKind::Unsigned),
    Attribute::read_only("mode", AttrKind::Unsigned),
    Attribute::read_only("uid", AttrKind::Unsigned),
    Attribute::read_only("gid", AttrKind::Unsigned),
    Attribute::read_only("nlink", AttrKind::Unsigned),
    Attribute::read_write("vs", AttrKind::Bitmap),
    Attribute::read_write("act", AttrKind::Bitmap),
];

/// Immutable snapshot of an inode for the decision authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileKobject {
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
    /// Membership set.
    pub vs: VirtualSpace,
    /// Monitored access types.
    pub act: AccessMask,
}

impl FileKobject {
    /// Snapshot `inode` with its resolved identity.
    pub fn from_inode(inode: &Inode, ctx: &SecurityContext) -> Self {
        Self {
            dev: inode.dev,
            ino: inode.ino,
            mode: inode.mode,
            uid: inode.uid,
            gid: inode.gid,
            nlink: inode.nlink,
            vs: ctx.vs,
            act: ctx.act,
        }
    }

    /// Identity of the snapshotted inode.
    pub fn id(&self) -> InodeId {
        InodeId {
            dev: self.dev,
            ino: self.ino,
        }
    }
}

impl Schema for FileKobject {
    const KIND: &'static str = "file";

    fn attributes() -> &'static [Attribute] {
        FILE_ATTRS
    }

    fn attribute(&self, name: &str) -> Option<AttrValue> {
        let value = match name {
            "dev" => AttrValue::Unsigned(self.dev),
            "ino" => AttrValue::Unsigned(self.ino),
            "mode" => AttrValue::Unsigned(u64::from(self.mode)),
            "uid" => AttrValue::Unsigned(u64::from(self.uid)),
            "gid" => AttrValue::Unsigned(u64::from(self.gid)),
            "nlink" => AttrValue::Unsigned(u64::from(self.nlink)),
            "vs" => self.vs.into(),
            "act" => self.act.into(),
            _ => return None,
        };
        Some(value)
    }
}
