//! Access-Type Registry.
//!
//! Holds, per access type, its attribute schema, its subject/object kinds
//! and its trigger mode. The table is populated once during startup through
//! [`RegistryBuilder`] and is immutable afterwards, so lookups during
//! mediation need no locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::access::AccessType;
use crate::kobject::SecurityContext;
use crate::schema::{AttrValue, Attribute, Schema};

/// Maximum number of access types; each owns one bit of an [`AccessMask`].
pub const MAX_ACCESS_TYPES: usize = 64;

/// Which side of an operation decides whether it is monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Monitored per subject (e.g. chroot).
    Subject,
    /// Monitored per object (e.g. readlink).
    Object,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => f.write_str("subject"),
            Self::Object => f.write_str("object"),
        }
    }
}

/// Index of a registered access type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessTypeId(u8);

impl AccessTypeId {
    /// Bit index of this access type.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Set of access types, one bit per [`AccessTypeId`].
///
/// Serialized as the ordered list of member indices.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct AccessMask(u64);

impl AccessMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    fn bit(index: usize) -> Option<u64> {
        1u64.checked_shl(u32::try_from(index).ok()?)
    }

    /// Mask with `id` added.
    #[must_use]
    pub fn with(self, id: AccessTypeId) -> Self {
        Self(self.0 | Self::bit(id.index()).unwrap_or(0))
    }

    /// Whether `id` is a member.
    pub fn contains(self, id: AccessTypeId) -> bool {
        Self::bit(id.index()).is_some_and(|bit| self.0 & bit != 0)
    }

    /// Whether no access type is a member.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Member indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_ACCESS_TYPES).filter(move |i| Self::bit(*i).is_some_and(|bit| self.0 & bit != 0))
    }
}

impl fmt::Debug for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl TryFrom<Vec<usize>> for AccessMask {
    type Error = RegistryError;

    fn try_from(indices: Vec<usize>) -> Result<Self, Self::Error> {
        indices.into_iter().try_fold(Self::EMPTY, |mask, index| {
            let bit = Self::bit(index).ok_or(RegistryError::Full)?;
            Ok(Self(mask.0 | bit))
        })
    }
}

impl From<AccessMask> for Vec<usize> {
    fn from(mask: AccessMask) -> Self {
        mask.iter().collect()
    }
}

impl From<AccessMask> for AttrValue {
    fn from(mask: AccessMask) -> Self {
        Self::Bitmap(mask.iter().collect())
    }
}

/// Registry errors. All of them are startup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An access type with this name is already registered.
    #[error("access type '{0}' registered twice")]
    Duplicate(&'static str),
    /// No bit left for another access type.
    #[error("access type table full (64 entries)")]
    Full,
    /// Name does not match any registered access type.
    #[error("unknown access type '{0}'")]
    Unknown(String),
    /// The process-wide registry was already installed.
    #[error("access type registry already installed")]
    AlreadyInstalled,
    /// The process-wide registry was never installed.
    #[error("access type registry not installed")]
    NotInstalled,
}

/// A subject or object kind as registered with an access type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KobjectTypeDef {
    /// Kind name ("process", "file").
    pub name: &'static str,
    /// Kind schema.
    pub attributes: &'static [Attribute],
}

impl KobjectTypeDef {
    fn of<K: Schema>() -> Self {
        Self {
            name: K::KIND,
            attributes: K::attributes(),
        }
    }
}

/// One registered access type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessTypeDef {
    /// Bit index.
    pub id: AccessTypeId,
    /// Access type name.
    pub name: &'static str,
    /// Access descriptor schema.
    pub attributes: &'static [Attribute],
    /// Subject kind.
    pub subject: KobjectTypeDef,
    /// Object kind.
    pub object: KobjectTypeDef,
    /// Which side is consulted for monitoring.
    pub trigger: TriggerMode,
}

/// Collects registrations during startup.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<AccessTypeDef>,
}

impl RegistryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register access type `A`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when `A::NAME` is already
    /// registered and [`RegistryError::Full`] when no bit is left.
    pub fn register<A: AccessType>(&mut self) -> Result<AccessTypeId, RegistryError> {
        if self.types.iter().any(|def| def.name == A::NAME) {
            return Err(RegistryError::Duplicate(A::NAME));
        }
        let index = u8::try_from(self.types.len())
            .ok()
            .filter(|i| usize::from(*i) < MAX_ACCESS_TYPES)
            .ok_or(RegistryError::Full)?;
        let id = AccessTypeId(index);
        self.types.push(AccessTypeDef {
            id,
            name: A::NAME,
            attributes: A::attributes(),
            subject: KobjectTypeDef::of::<A::Subject>(),
            object: KobjectTypeDef::of::<A::Object>(),
            trigger: A::TRIGGER,
        });
        info!(acctype = A::NAME, id = index, trigger = %A::TRIGGER, "access type registered");
        Ok(id)
    }

    /// Freeze the table.
    pub fn build(self) -> AccessTypeRegistry {
        let by_name = self.types.iter().map(|def| (def.name, def.id)).collect();
        AccessTypeRegistry {
            types: self.types,
            by_name,
        }
    }
}

/// Immutable table of registered access types.
#[derive(Debug)]
pub struct AccessTypeRegistry {
    types: Vec<AccessTypeDef>,
    by_name: HashMap<&'static str, AccessTypeId>,
}

impl AccessTypeRegistry {
    /// Definition registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&AccessTypeDef> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Definition with index `id`.
    pub fn get(&self, id: AccessTypeId) -> Option<&AccessTypeDef> {
        self.types.get(id.index())
    }

    /// All definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AccessTypeDef> {
        self.types.iter()
    }

    /// Number of registered access types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Mask containing the named access types.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unknown`] for an unregistered name.
    pub fn mask<S: AsRef<str>>(&self, names: &[S]) -> Result<AccessMask, RegistryError> {
        names.iter().try_fold(AccessMask::EMPTY, |mask, name| {
            let def = self
                .lookup(name.as_ref())
                .ok_or_else(|| RegistryError::Unknown(name.as_ref().to_owned()))?;
            Ok(mask.with(def.id))
        })
    }

    /// Whether access type `id` is currently monitored for the entity owning `ctx`.
    pub fn is_monitored(&self, id: AccessTypeId, ctx: &SecurityContext) -> bool {
        ctx.act.contains(id)
    }
}

static GLOBAL: OnceLock<Arc<AccessTypeRegistry>> = OnceLock::new();

/// Install the process-wide registry. Must happen before the first mediation.
///
/// # Errors
///
/// Returns [`RegistryError::AlreadyInstalled`] on a second call.
pub fn install_global(registry: Arc<AccessTypeRegistry>) -> Result<(), RegistryError> {
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInstalled)
}

/// The process-wide registry, if installed.
pub fn global() -> Option<Arc<AccessTypeRegistry>> {
    GLOBAL.get().cloned()
}
