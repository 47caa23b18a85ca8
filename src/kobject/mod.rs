//! Kernel Object Adapter.
//!
//! Turns live host state (tasks, inodes, dentries, paths) into immutable
//! descriptors for the decision authority, and resolves the security
//! identity of an entity through an explicit, cached `ensure_*` step.

mod file;
mod host;
mod identity;
mod process;

pub use file::FileKobject;
pub use host::{dentry_name, dentry_name_mnt, Dentry, Filename, Inode, Mount, Path, Task, NAME_MAX};
pub use identity::{IdentityCache, IdentitySource, SecurityContext, Unidentifiable};
pub use process::ProcessKobject;
