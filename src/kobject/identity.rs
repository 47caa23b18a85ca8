// Security identity resolution with an explicit, invalidatable cache.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::host::{Inode, Mount, Task};
use crate::registry::AccessMask;
use crate::types::EntityId;
use crate::vs::VirtualSpace;

/// Security labels of one subject or object.
///
/// Label sets are read-only during evaluation; changes replace the whole
/// snapshot through [`IdentityCache::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityContext {
    /// Membership set.
    #[serde(default)]
    pub vs: VirtualSpace,
    /// Readable-by set (meaningful on subjects).
    #[serde(default)]
    pub vss: VirtualSpace,
    /// Writable-by set (meaningful on subjects).
    #[serde(default)]
    pub vsw: VirtualSpace,
    /// Access types currently monitored for this entity.
    #[serde(default)]
    pub act: AccessMask,
}

/// The entity has no valid security identity and none could be derived.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no security identity for {0}")]
pub struct Unidentifiable(pub EntityId);

/// External labeling collaborator that derives identities on demand.
///
/// Returning `None` means the entity cannot be labelled right now.
pub trait IdentitySource: Send + Sync {
    /// Derive the identity of a task.
    fn task_identity(&self, task: &Task) -> Option<SecurityContext>;

    /// Derive the identity of an inode, optionally through its mount.
    fn inode_identity(&self, inode: &Inode, mount: Option<&Mount>) -> Option<SecurityContext>;
}

/// Cache of resolved identities keyed by entity.
///
/// The owner of an entity calls [`invalidate`](Self::invalidate) when the
/// entity is destroyed or its identity reused.
pub struct IdentityCache {
    entries: RwLock<HashMap<EntityId, Arc<SecurityContext>>>,
    source: Arc<dyn IdentitySource>,
}

impl IdentityCache {
    /// Create an empty cache backed by `source`.
    pub fn new(source: Arc<dyn IdentitySource>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            source,
        }
    }

    /// Resolve the identity of `task`, deriving it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`Unidentifiable`] when the source cannot label the task.
    pub fn ensure_task(&self, task: &Task) -> Result<Arc<SecurityContext>, Unidentifiable> {
        self.ensure(task.entity_id(), || self.source.task_identity(task))
    }

    /// Resolve the identity of `inode`, deriving it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`Unidentifiable`] when the source cannot label the inode.
    pub fn ensure_inode(
        &self,
        inode: &Inode,
        mount: Option<&Mount>,
    ) -> Result<Arc<SecurityContext>, Unidentifiable> {
        self.ensure(inode.entity_id(), || self.source.inode_identity(inode, mount))
    }

    fn ensure(
        &self,
        id: EntityId,
        derive: impl FnOnce() -> Option<SecurityContext>,
    ) -> Result<Arc<SecurityContext>, Unidentifiable> {
        if let Some(ctx) = self.get(id) {
            return Ok(ctx);
        }
        let Some(ctx) = derive() else {
            debug!(entity = %id, "identity revalidation failed");
            return Err(Unidentifiable(id));
        };
        debug!(entity = %id, "identity revalidated");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // A concurrent caller may have stored an identity in the meantime; keep theirs.
        let ctx = entries.entry(id).or_insert_with(|| Arc::new(ctx));
        Ok(Arc::clone(ctx))
    }

    /// Cached identity of `id`, without deriving.
    pub fn get(&self, id: EntityId) -> Option<Arc<SecurityContext>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Store an identity assigned by the labeling collaborator.
    pub fn set(&self, id: EntityId, ctx: SecurityContext) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(ctx));
    }

    /// Drop the cached identity of `id`. Returns whether one was cached.
    pub fn invalidate(&self, id: EntityId) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Number of cached identities.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("entries", &self.len())
            .field("source", &"<dyn IdentitySource>")
            .finish()
    }
}
