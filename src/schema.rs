//! Declarative attribute schemas.
//!
//! Access descriptors and kernel objects describe their fields as an ordered
//! list of [`Attribute`]s. Payloads sent to the decision authority are built
//! from that list, so the authority sees exactly the registered schema.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::vs::VirtualSpace;

/// Wire kind of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    /// UTF-8 string.
    String,
    /// Unsigned integer.
    Unsigned,
    /// Signed integer.
    Signed,
    /// Set of bit positions (virtual spaces, access masks).
    Bitmap,
}

/// Whether the authority may change an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrMode {
    /// Read-only for the authority.
    ReadOnly,
    /// The authority may write it back.
    ReadWrite,
}

/// One field of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Field name as seen by the authority.
    pub name: &'static str,
    /// Value kind.
    pub kind: AttrKind,
    /// Access mode.
    pub mode: AttrMode,
}

impl Attribute {
    /// A read-only attribute.
    pub const fn read_only(name: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            kind,
            mode: AttrMode::ReadOnly,
        }
    }

    /// A read-write attribute.
    pub const fn read_write(name: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            kind,
            mode: AttrMode::ReadWrite,
        }
    }
}

/// A concrete attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// String value.
    String(String),
    /// Unsigned value.
    Unsigned(u64),
    /// Signed value.
    Signed(i64),
    /// Bit positions, ascending.
    Bitmap(Vec<usize>),
}

impl AttrValue {
    /// The kind this value encodes as.
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::String(_) => AttrKind::String,
            Self::Unsigned(_) => AttrKind::Unsigned,
            Self::Signed(_) => AttrKind::Signed,
            Self::Bitmap(_) => AttrKind::Bitmap,
        }
    }

    fn into_json(self) -> Value {
        match self {
            Self::String(s) => Value::String(s),
            Self::Unsigned(n) => Value::from(n),
            Self::Signed(n) => Value::from(n),
            Self::Bitmap(bits) => Value::from(bits),
        }
    }
}

impl From<VirtualSpace> for AttrValue {
    fn from(set: VirtualSpace) -> Self {
        Self::Bitmap(set.iter().collect())
    }
}

/// Schema payload errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The value does not expose a declared attribute.
    #[error("attribute '{attribute}' missing from {kind}")]
    Missing {
        /// Kind or access type being encoded.
        kind: &'static str,
        /// Declared attribute name.
        attribute: &'static str,
    },
    /// The value kind differs from the declared kind.
    #[error("attribute '{attribute}' of {kind} is {actual:?}, declared {expected:?}")]
    KindMismatch {
        /// Kind or access type being encoded.
        kind: &'static str,
        /// Declared attribute name.
        attribute: &'static str,
        /// Declared kind.
        expected: AttrKind,
        /// Kind actually produced.
        actual: AttrKind,
    },
}

/// A value described by a static attribute schema.
pub trait Schema {
    /// Name used in payloads and errors ("process", "chroot", ...).
    const KIND: &'static str;

    /// Declared attributes, in payload order.
    fn attributes() -> &'static [Attribute];

    /// Introspect one attribute by name.
    fn attribute(&self, name: &str) -> Option<AttrValue>;
}

/// Encode `value` into a payload following its declared schema.
///
/// # Errors
///
/// Returns [`SchemaError`] if a declared attribute is missing or has the
/// wrong kind.
pub fn encode<S: Schema>(value: &S) -> Result<Map<String, Value>, SchemaError> {
    let mut payload = Map::new();
    for attr in S::attributes() {
        let v = value.attribute(attr.name).ok_or(SchemaError::Missing {
            kind: S::KIND,
            attribute: attr.name,
        })?;
        if v.kind() != attr.kind {
            return Err(SchemaError::KindMismatch {
                kind: S::KIND,
                attribute: attr.name,
                expected: attr.kind,
                actual: v.kind(),
            });
        }
        payload.insert(attr.name.to_owned(), v.into_json());
    }
    Ok(payload)
}
