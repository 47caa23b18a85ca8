//! Scenario files for the `medusa check` command.
//!
//! A scenario describes one mediated call: the operation, the calling task,
//! the target inode, their labels, and the answer the decision authority
//! should give when consulted.
//!
//! ```toml
//! operation = "chroot"
//! name = "jail"
//! authority = "deny"
//!
//! [subject]
//! pid = 100
//! vss = [1, 2]
//! vsw = [1, 2]
//! monitored = ["chroot"]
//!
//! [object]
//! ino = 12
//! vs = [3]
//! ```
//!
//! Chroot targets are reached through the `[mount]` table (`point`, `root`),
//! which defaults to `/` with root inode [`ROOT_INO`].

use std::path::Path as FsPath;

use serde::Deserialize;

use crate::access;
use crate::kobject::{Dentry, IdentitySource, Inode, Mount, Path, SecurityContext, Task};
use crate::mediator::{MediationError, Mediator};
use crate::registry::{AccessTypeRegistry, RegistryError};
use crate::types::{Answer, InodeId, Pid};
use crate::vs::VirtualSpace;

/// Operation exercised by a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOperation {
    /// Change root to the target directory.
    Chroot,
    /// Read the target symlink.
    Readlink,
}

impl ScenarioOperation {
    /// Access type name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::Chroot => "chroot",
            Self::Readlink => "readlink",
        }
    }
}

/// Labels of a scenario entity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioLabels {
    /// Membership set.
    #[serde(default)]
    pub vs: VirtualSpace,
    /// Readable-by set.
    #[serde(default)]
    pub vss: VirtualSpace,
    /// Writable-by set.
    #[serde(default)]
    pub vsw: VirtualSpace,
    /// Names of access types monitored for this entity.
    #[serde(default)]
    pub monitored: Vec<String>,
    /// The entity has no identity and cannot be labelled.
    #[serde(default)]
    pub unlabeled: bool,
}

impl ScenarioLabels {
    fn context(
        &self,
        registry: &AccessTypeRegistry,
    ) -> Result<Option<SecurityContext>, RegistryError> {
        if self.unlabeled {
            return Ok(None);
        }
        Ok(Some(SecurityContext {
            vs: self.vs,
            vss: self.vss,
            vsw: self.vsw,
            act: registry.mask(self.monitored.as_slice())?,
        }))
    }
}

/// Calling task of a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSubject {
    /// Process id.
    pub pid: Pid,
    /// User id (real and effective).
    #[serde(default)]
    pub uid: u32,
    /// Group id (real and effective).
    #[serde(default)]
    pub gid: u32,
    /// Command name.
    #[serde(default = "default_comm")]
    pub comm: String,
    /// Labels.
    #[serde(flatten)]
    pub labels: ScenarioLabels,
}

/// Target inode of a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioObject {
    /// Device number.
    #[serde(default)]
    pub dev: u64,
    /// Inode number.
    pub ino: u64,
    /// File mode bits.
    #[serde(default)]
    pub mode: u32,
    /// Labels.
    #[serde(flatten)]
    pub labels: ScenarioLabels,
}

/// Root directory inode number of ext-family filesystems.
pub const ROOT_INO: u64 = 2;

/// Mount a chroot target is reached through, on the target's device.
///
/// The target is the mount root when its inode number equals `root`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioMount {
    /// Mount point path.
    #[serde(default = "default_mount_point")]
    pub point: String,
    /// Inode number of the mounted filesystem's root directory.
    #[serde(default = "default_root_ino")]
    pub root: u64,
}

impl Default for ScenarioMount {
    fn default() -> Self {
        Self {
            point: default_mount_point(),
            root: default_root_ino(),
        }
    }
}

fn default_comm() -> String {
    "sh".to_owned()
}
fn default_mount_point() -> String {
    "/".to_owned()
}
fn default_root_ino() -> u64 {
    ROOT_INO
}

/// One mediated call described in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Operation to mediate.
    pub operation: ScenarioOperation,
    /// Name of the target dentry.
    pub name: String,
    /// For chroot: the mount the target is reached through.
    #[serde(default)]
    pub mount: ScenarioMount,
    /// Answer of the decision authority; the configured default when unset.
    #[serde(default)]
    pub authority: Option<Answer>,
    /// Calling task.
    pub subject: ScenarioSubject,
    /// Target inode.
    pub object: ScenarioObject,
}

impl Scenario {
    /// Load a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &FsPath) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read scenario at {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("failed to parse scenario at {}: {e}", path.display()))
    }

    /// The calling task.
    pub fn task(&self) -> Task {
        let s = &self.subject;
        Task {
            pid: s.pid,
            tgid: s.pid,
            uid: s.uid,
            euid: s.uid,
            gid: s.gid,
            egid: s.gid,
            comm: s.comm.clone(),
        }
    }

    /// The target inode.
    pub fn inode(&self) -> Inode {
        let o = &self.object;
        Inode {
            dev: o.dev,
            ino: o.ino,
            mode: o.mode,
            uid: 0,
            gid: 0,
            nlink: 1,
        }
    }

    /// Identity source labelling the scenario's subject and object.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unknown`] for an unregistered monitored name.
    pub fn identity_source(
        &self,
        registry: &AccessTypeRegistry,
    ) -> Result<ScenarioIdentity, RegistryError> {
        Ok(ScenarioIdentity {
            subject: self.subject.labels.context(registry)?,
            object: self.object.labels.context(registry)?,
        })
    }

    /// The target dentry.
    pub fn dentry(&self) -> Dentry {
        Dentry {
            name: self.name.clone(),
            inode: self.inode(),
        }
    }

    /// The target reached through the scenario's mount.
    pub fn path(&self) -> Path {
        let dentry = self.dentry();
        Path {
            mnt: Mount {
                mountpoint: self.mount.point.clone(),
                root: InodeId {
                    dev: dentry.inode.dev,
                    ino: self.mount.root,
                },
            },
            dentry,
        }
    }

    /// Run the scenario's operation through `mediator`.
    ///
    /// # Errors
    ///
    /// Propagates [`MediationError`] from the hook.
    pub fn run(&self, mediator: &Mediator) -> Result<Answer, MediationError> {
        let task = self.task();
        match self.operation {
            ScenarioOperation::Chroot => access::chroot(mediator, &task, &self.path()),
            ScenarioOperation::Readlink => access::readlink(mediator, &task, &self.dentry()),
        }
    }
}

/// Identity source answering with a scenario's fixed labels.
#[derive(Debug, Clone)]
pub struct ScenarioIdentity {
    subject: Option<SecurityContext>,
    object: Option<SecurityContext>,
}

impl IdentitySource for ScenarioIdentity {
    fn task_identity(&self, _task: &Task) -> Option<SecurityContext> {
        self.subject
    }

    fn inode_identity(&self, _inode: &Inode, _mount: Option<&Mount>) -> Option<SecurityContext> {
        self.object
    }
}
