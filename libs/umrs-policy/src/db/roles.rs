// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Role declarations (§3). Structurally identical to an attribute
//! declaration, plus a (possibly transitive) dominance set.
// ===========================================================================

use std::collections::BTreeSet;

use crate::ids::{RoleIndex, TypeIndex};

#[derive(Debug, Clone, Default)]
pub struct RoleDecl {
    pub name: String,
    pub dominated_roles: BTreeSet<RoleIndex>,
    pub type_set: BTreeSet<TypeIndex>,
}
