// readlink: subject = task, object = the symlink's inode.
// Monitoring is decided per object.

use serde::Serialize;

use super::{AccessHeader, AccessType};
use crate::audit::AuditTarget;
use crate::kobject::{dentry_name, Dentry, FileKobject, Filename, ProcessKobject, Task};
use crate::mediator::{MediationError, Mediator, Operation};
use crate::registry::TriggerMode;
use crate::schema::{AttrKind, AttrValue, Attribute, Schema};
use crate::types::Answer;

const READLINK_ATTRS: &[Attribute] = &[Attribute::read_only("filename", AttrKind::String)];

/// Descriptor of a `readlink` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadlinkAccess {
    /// Shared header.
    pub header: AccessHeader,
    /// Name of the link being read.
    pub filename: Filename,
}

impl Schema for ReadlinkAccess {
    const KIND: &'static str = "readlink";

    fn attributes() -> &'static [Attribute] {
        READLINK_ATTRS
    }

    fn attribute(&self, name: &str) -> Option<AttrValue> {
        (name == "filename").then(|| AttrValue::String(self.filename.as_str().to_owned()))
    }
}

impl AccessType for ReadlinkAccess {
    const TRIGGER: TriggerMode = TriggerMode::Object;
    type Subject = ProcessKobject;
    type Object = FileKobject;

    fn header(&self) -> &AccessHeader {
        &self.header
    }
}

/// Mediate `current` reading the symlink at `dentry`.
///
/// # Errors
///
/// Propagates a decision authority failure; see [`MediationError`].
pub fn readlink(
    mediator: &Mediator,
    current: &Task,
    dentry: &Dentry,
) -> Result<Answer, MediationError> {
    let filename = dentry_name(dentry);
    let op = Operation {
        task: current,
        inode: &dentry.inode,
        mount: None,
        target: AuditTarget::Dentry {
            name: filename.as_str().to_owned(),
        },
    };
    mediator.mediate(op, |header| ReadlinkAccess { header, filename })
}
