//! Identities for requested values. A [Key] is the unit of resolution throughout the crate: every
//! binding provides a value for exactly one key, and every lookup starts from one.

use std::any::{type_name, TypeId};
use std::fmt::{Display, Formatter};

/// A type identity plus an optional qualifier. Two keys are equal iff both parts are equal, so a
/// single type can be bound multiple times under different qualifiers.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<String>,
}

impl Key {
    /// Creates an unqualified key for `T`. The type may be unsized, so abstractions can be keyed
    /// directly as `dyn Trait`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            qualifier: None,
        }
    }

    /// Returns a copy of this key with the given qualifier.
    pub fn with_qualifier<Q: Into<String>>(mut self, qualifier: Q) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Checks whether `other` provides the same type under a different qualifier - a near-miss
    /// reported in diagnostics when no exact binding exists.
    pub(crate) fn is_candidate_for(&self, other: &Key) -> bool {
        self.type_id == other.type_id && self.qualifier != other.qualifier
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, " (qualifier=\"{qualifier}\")")?;
        }

        Ok(())
    }
}
