//! Virtual Space Evaluator: the fast-path mandatory access check.
//!
//! Every subject and object carries three virtual-space sets: membership
//! (VS), readable-by (VSS) and writable-by (VSW). A mediated operation only
//! proceeds past the fast path when the subject's VSS and VSW both intersect
//! the object's VS. A disjoint result is a definitive deny that never
//! reaches the decision authority.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kobject::SecurityContext;

/// Number of distinct virtual spaces.
pub const VS_BITS: usize = 256;

const WORD_BITS: usize = 64;
const WORDS: usize = VS_BITS / WORD_BITS;

/// Errors building a virtual-space set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VsError {
    /// Space number does not fit the fixed-width set.
    #[error("virtual space {space} out of range (must be below 256)")]
    OutOfRange {
        /// The rejected space number.
        space: usize,
    },
}

/// Fixed-width set of virtual spaces.
///
/// Serialized as the ordered list of member space numbers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct VirtualSpace {
    words: [u64; WORDS],
}

/// Word index and bit mask for a space number.
fn locate(space: usize) -> Option<(usize, u64)> {
    if space >= VS_BITS {
        return None;
    }
    let word = space.checked_div(WORD_BITS)?;
    let bit = u32::try_from(space.checked_rem(WORD_BITS)?).ok()?;
    Some((word, 1u64.checked_shl(bit)?))
}

impl VirtualSpace {
    /// The empty set.
    pub const EMPTY: Self = Self { words: [0; WORDS] };

    /// Build a set from space numbers.
    ///
    /// # Errors
    ///
    /// Returns [`VsError::OutOfRange`] for any space `>= VS_BITS`.
    pub fn from_spaces(spaces: impl IntoIterator<Item = usize>) -> Result<Self, VsError> {
        let mut set = Self::EMPTY;
        for space in spaces {
            set.insert(space)?;
        }
        Ok(set)
    }

    /// Add a space to the set.
    ///
    /// # Errors
    ///
    /// Returns [`VsError::OutOfRange`] for any space `>= VS_BITS`.
    pub fn insert(&mut self, space: usize) -> Result<(), VsError> {
        let (word, mask) = locate(space).ok_or(VsError::OutOfRange { space })?;
        if let Some(slot) = self.words.get_mut(word) {
            *slot |= mask;
        }
        Ok(())
    }

    /// Whether `space` is a member.
    pub fn contains(&self, space: usize) -> bool {
        locate(space)
            .and_then(|(word, mask)| self.words.get(word).map(|w| w & mask != 0))
            .unwrap_or(false)
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Whether the two sets share at least one space.
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Member spaces in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..VS_BITS).filter(move |space| self.contains(*space))
    }
}

impl fmt::Debug for VirtualSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl TryFrom<Vec<usize>> for VirtualSpace {
    type Error = VsError;

    fn try_from(spaces: Vec<usize>) -> Result<Self, Self::Error> {
        Self::from_spaces(spaces)
    }
}

impl From<VirtualSpace> for Vec<usize> {
    fn from(set: VirtualSpace) -> Self {
        set.iter().collect()
    }
}

/// Whether two virtual-space sets intersect.
pub fn intersects(a: &VirtualSpace, b: &VirtualSpace) -> bool {
    a.intersects(b)
}

/// Label sets captured verbatim when the fast path denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsDenial {
    /// Object membership set.
    pub vst: VirtualSpace,
    /// Subject readable-by set.
    pub vss: VirtualSpace,
    /// Subject writable-by set.
    pub vsw: VirtualSpace,
}

/// Fast-path check of `subject` against `object`.
///
/// Both VSS ∩ VS and VSW ∩ VS must be non-empty.
///
/// # Errors
///
/// Returns the three label sets involved when either intersection is empty.
pub fn check(subject: &SecurityContext, object: &SecurityContext) -> Result<(), VsDenial> {
    if intersects(&subject.vss, &object.vs) && intersects(&subject.vsw, &object.vs) {
        return Ok(());
    }
    Err(VsDenial {
        vst: object.vs,
        vss: subject.vss,
        vsw: subject.vsw,
    })
}
