//! Runtime type tags and the subtype relation used by contract checks.
//!
//! # Invariants
//! - `is_subtype_of` is reflexive and every type is a subtype of `Any`.
//! - `Int` and `Float` are subtypes of `Number`.
//! - Object kinds form a single-inheritance tree of `'static` nodes.

use std::fmt::{Display, Formatter};

/// Static domain object kind with an optional parent kind.
///
/// Kinds are declared as `static` items so that a value can carry a cheap
/// `&'static ObjectKind` reference:
///
/// ```
/// use cmdhub_core::ObjectKind;
///
/// static ITEM: ObjectKind = ObjectKind::root("Item");
/// static GALLERY: ObjectKind = ObjectKind::child("Gallery", &ITEM);
///
/// assert!(GALLERY.descends_from(&ITEM));
/// ```
#[derive(Debug)]
pub struct ObjectKind {
    name: &'static str,
    parent: Option<&'static ObjectKind>,
}

impl ObjectKind {
    /// Declares a kind without a parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declares a kind deriving from `parent`.
    pub const fn child(name: &'static str, parent: &'static ObjectKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ObjectKind> {
        self.parent
    }

    /// Returns true when `ancestor` is this kind or one of its parents.
    pub fn descends_from(&self, ancestor: &ObjectKind) -> bool {
        if self == ancestor {
            return true;
        }
        let mut current = self.parent;
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent;
        }
        false
    }
}

// Kinds are compared by name; two kinds with the same name are the same kind.
impl PartialEq for ObjectKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ObjectKind {}

/// Declared or runtime type of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Any,
    Null,
    Bool,
    Number,
    Int,
    Float,
    Str,
    List,
    Map,
    /// A type tag passed as a value.
    Type,
    Object(&'static ObjectKind),
}

impl ValueType {
    /// Returns true when `self` may be used where `declared` is expected.
    pub fn is_subtype_of(self, declared: ValueType) -> bool {
        match (self, declared) {
            (_, ValueType::Any) => true,
            (ValueType::Int | ValueType::Float, ValueType::Number) => true,
            (ValueType::Object(kind), ValueType::Object(ancestor)) => kind.descends_from(ancestor),
            (left, right) => left == right,
        }
    }

    /// Stable display name used in error messages and descriptors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Map => "map",
            Self::Type => "type",
            Self::Object(kind) => kind.name(),
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{ObjectKind, ValueType};

    static ITEM: ObjectKind = ObjectKind::root("Item");
    static GALLERY: ObjectKind = ObjectKind::child("Gallery", &ITEM);
    static COLLECTION: ObjectKind = ObjectKind::child("Collection", &ITEM);
    static TAG: ObjectKind = ObjectKind::root("Tag");

    #[test]
    fn subtype_relation_is_reflexive() {
        for ty in [
            ValueType::Null,
            ValueType::Bool,
            ValueType::Int,
            ValueType::Str,
            ValueType::Type,
            ValueType::Object(&GALLERY),
        ] {
            assert!(ty.is_subtype_of(ty), "{ty} should be a subtype of itself");
        }
    }

    #[test]
    fn everything_is_a_subtype_of_any() {
        assert!(ValueType::Map.is_subtype_of(ValueType::Any));
        assert!(ValueType::Object(&TAG).is_subtype_of(ValueType::Any));
        assert!(!ValueType::Any.is_subtype_of(ValueType::Str));
    }

    #[test]
    fn numeric_types_widen_to_number() {
        assert!(ValueType::Int.is_subtype_of(ValueType::Number));
        assert!(ValueType::Float.is_subtype_of(ValueType::Number));
        assert!(!ValueType::Number.is_subtype_of(ValueType::Int));
        assert!(!ValueType::Int.is_subtype_of(ValueType::Float));
    }

    #[test]
    fn object_kinds_follow_parent_chain() {
        assert!(ValueType::Object(&GALLERY).is_subtype_of(ValueType::Object(&ITEM)));
        assert!(!ValueType::Object(&ITEM).is_subtype_of(ValueType::Object(&GALLERY)));
        assert!(!ValueType::Object(&GALLERY).is_subtype_of(ValueType::Object(&COLLECTION)));
        assert!(!ValueType::Object(&TAG).is_subtype_of(ValueType::Object(&ITEM)));
    }

    #[test]
    fn displays_object_kind_name() {
        assert_eq!(ValueType::Object(&GALLERY).to_string(), "Gallery");
        assert_eq!(ValueType::Str.to_string(), "str");
    }
}
