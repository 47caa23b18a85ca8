// Subject descriptor: a snapshot of the calling task.

use serde::Serialize;

use super::host::Task;
use super::identity::SecurityContext;
use crate::registry::AccessMask;
use crate::schema::{AttrKind, AttrValue, Attribute, Schema};
use crate::types::Pid;
use crate::vs::VirtualSpace;

const PROCESS_ATTRS: &[Attribute] = &[
    Attribute::read_only("pid", AttrKind::Signed),
    Attribute::read_only("tgid", AttrKind::Signed),
    Attribute::read_only("uid", AttrKind::Unsigned),
    Attribute::read_only("euid", AttrKind::Unsigned),
    Attribute::read_only("gid", AttrKind::Unsigned),
    Attribute::read_only("egid", AttrKind::Unsigned),
    Attribute::read_only("comm", AttrKind::String),
    Attribute::read_write("vs", AttrKind::Bitmap),
    Attribute::read_write("vss", AttrKind::Bitmap),
    Attribute::read_write("vsw", AttrKind::Bitmap),
    Attribute::read_write("act", AttrKind::Bitmap),
];

/// Immutable snapshot of a task for the decision authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessKobject {
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
    /// Membership set.
    pub vs: VirtualSpace,
    /// Readable-by set.
    pub vss: VirtualSpace,
    /// Writable-by set.
    pub vsw: VirtualSpace,
    /// Monitored access types.
    pub act: AccessMask,
}

impl ProcessKobject {
    /// Snapshot `task` with its resolved identity.
    pub fn from_task(task: &Task, ctx: &SecurityContext) -> Self {
        Self {
            pid: task.pid,
            tgid: task.tgid,
            uid: task.uid,
            euid: task.euid,
            gid: task.gid,
            egid: task.egid,
            comm: task.comm.clone(),
            vs: ctx.vs,
            vss: ctx.vss,
            vsw: ctx.vsw,
            act: ctx.act,
        }
    }
}

impl Schema for ProcessKobject {
    const KIND: &'static str = "process";

    fn attributes() -> &'static [Attribute] {
        PROCESS_ATTRS
    }

    fn attribute(&self, name: &str) -> Option<AttrValue> {
        let value = match name {
            "pid" => AttrValue::Signed(i64::from(self.pid)),
            "tgid" => AttrValue::Signed(i64::from(self.tgid)),
            "uid" => AttrValue::Unsigned(u64::from(self.uid)),
            "euid" => AttrValue::Unsigned(u64::from(self.euid)),
            "gid" => AttrValue::Unsigned(u64::from(self.gid)),
            "egid" => AttrValue::Unsigned(u64::from(self.egid)),
            "comm" => AttrValue::String(self.comm.clone()),
            "vs" => self.vs.into(),
            "vss" => self.vss.into(),
            "vsw" => self.vsw.into(),
            "act" => self.act.into(),
            _ => return None,
        };
        Some(value)
    }
}
