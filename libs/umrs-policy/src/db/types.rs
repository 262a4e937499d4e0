// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Type and attribute declarations (§3).
//!
//! Types and attributes form a symmetric bidirectional relation: if type T
//! is in attribute A's type-set, A must be in T's attribute-set. Only one
//! side is stored authoritatively per §9 ("types-have-attributes is the
//! hotter path during expansion"); the other is materialized as an indexed
//! view kept in lock-step by [`crate::db::PolicyDb::add_type_to_attribute`].
// ===========================================================================

use std::collections::BTreeSet;

use crate::ids::{AttrIndex, TypeIndex};

#[derive(Debug, Clone, Default)]
pub struct TypeDecl {
    pub name: String,
    pub aliases: Vec<String>,
    /// Authoritative: which attributes this type belongs to.
    pub attribute_set: BTreeSet<AttrIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeDecl {
    pub name: String,
    /// Materialized view: which types belong to this attribute. Kept in
    /// sync with every `TypeDecl::attribute_set` insertion.
    pub type_set: BTreeSet<TypeIndex>,
}
