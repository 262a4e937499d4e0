// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Dense 32-bit symbol-table indices.
//!
//! Every declaration kind (types, attributes, roles, users, classes,
//! permissions, common permissions, booleans) gets its own index newtype so
//! the type checker rejects a `RoleIndex` passed where a `TypeIndex` is
//! expected. Indices are assigned monotonically in declaration order
//! starting at 0; for types, index 0 is reserved for the `self`
//! pseudo-type and is never produced by `SymbolTable::intern`.
// ===========================================================================

use std::fmt;

macro_rules! dense_index {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            #[must_use]
            pub const fn value(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

dense_index!(TypeIndex, "Index into the type symbol table.");
dense_index!(AttrIndex, "Index into the attribute symbol table.");
dense_index!(RoleIndex, "Index into the role symbol table.");
dense_index!(UserIndex, "Index into the user symbol table.");
dense_index!(ClassIndex, "Index into the object-class symbol table.");
dense_index!(PermIndex, "Index into the permission symbol table.");
dense_index!(
    CommonPermIndex,
    "Index into the common-permission symbol table."
);
dense_index!(BoolIndex, "Index into the conditional-boolean symbol table.");

/// The sentinel type index standing for the `self` pseudo-type. Never
/// stored in a materialized type set; substituted at query time with the
/// current source-set iterator value (§4.C, §9).
pub const SELF_TYPE: TypeIndex = TypeIndex::new(0);
