// chroot: subject = task, object = the new root's inode.
// Monitoring is decided per subject.

use serde::Serialize;

use super::{AccessHeader, AccessType};
use crate::audit::AuditTarget;
use crate::kobject::{dentry_name_mnt, FileKobject, Filename, Path, ProcessKobject, Task};
use crate::mediator::{MediationError, Mediator, Operation};
use crate::registry::TriggerMode;
use crate::schema::{AttrKind, AttrValue, Attribute, Schema};
use crate::types::Answer;

const CHROOT_ATTRS: &[Attribute] = &[Attribute::read_only("filename", AttrKind::String)];

/// Descriptor of a `chroot` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChrootAccess {
    /// Shared header.
    pub header: AccessHeader,
    /// Name of the new root directory.
    pub filename: Filename,
}

impl Schema for ChrootAccess {
    const KIND: &'static str = "chroot";

    fn attributes() -> &'static [Attribute] {
        CHROOT_ATTRS
    }

    fn attribute(&self, name: &str) -> Option<AttrValue> {
        (name == "filename").then(|| AttrValue::String(self.filename.as_str().to_owned()))
    }
}

impl AccessType for ChrootAccess {
    const TRIGGER: TriggerMode = TriggerMode::Subject;
    type Subject = ProcessKobject;
    type Object = FileKobject;

    fn header(&self) -> &AccessHeader {
        &self.header
    }
}

/// Mediate `current` changing its root to `path`.
///
/// # Errors
///
/// Propagates a decision authority failure; see [`MediationError`].
pub fn chroot(mediator: &Mediator, current: &Task, path: &Path) -> Result<Answer, MediationError> {
    let filename = dentry_name_mnt(path);
    let op = Operation {
        task: current,
        inode: &path.dentry.inode,
        mount: Some(&path.mnt),
        target: AuditTarget::Path {
            path: filename.as_str().to_owned(),
        },
    };
    mediator.mediate(op, |header| ChrootAccess { header, filename })
}
