//! Access descriptors and the hooks that mediate them.
//!
//! Each access type is a plain struct embedding the shared
//! [`AccessHeader`] plus its own fields, described by a static schema.
//! Hooks are thin: they name the subject, the object and the descriptor,
//! and hand everything else to [`Mediator::mediate`](crate::mediator::Mediator::mediate).

mod chroot;
mod readlink;

pub use chroot::{chroot, ChrootAccess};
pub use readlink::{readlink, ReadlinkAccess};

use serde::Serialize;

use crate::registry::{AccessTypeId, RegistryBuilder, RegistryError, TriggerMode};
use crate::schema::Schema;

/// Fields common to every access descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessHeader {
    /// Registered access type of the descriptor.
    pub acctype: AccessTypeId,
}

impl AccessHeader {
    /// Header for access type `acctype`.
    pub fn new(acctype: AccessTypeId) -> Self {
        Self { acctype }
    }
}

/// A kind of mediated operation.
pub trait AccessType: Schema {
    /// Registered name; equal to [`Schema::KIND`].
    const NAME: &'static str = Self::KIND;

    /// Which side decides whether the access type is monitored.
    const TRIGGER: TriggerMode;

    /// Subject descriptor kind.
    type Subject: Schema;

    /// Object descriptor kind.
    type Object: Schema;

    /// Shared header.
    fn header(&self) -> &AccessHeader;
}

/// Register every built-in access type.
///
/// # Errors
///
/// Fails if any of them is already registered in `builder`.
pub fn register_builtin(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder.register::<ChrootAccess>()?;
    builder.register::<ReadlinkAccess>()?;
    Ok(())
}
