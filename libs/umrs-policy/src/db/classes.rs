// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Object classes and common permissions (§3).
//!
//! A class's full permission set is `common_perm.perms ∪ unique_perms`
//! where `common_perm` is optional.
// ===========================================================================

use std::collections::BTreeSet;

use crate::ids::{CommonPermIndex, PermIndex};

#[derive(Debug, Clone, Default)]
pub struct ObjectClass {
    pub name: String,
    pub value: u32,
    pub common_perm: Option<CommonPermIndex>,
    pub unique_perms: BTreeSet<PermIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct CommonPermission {
    pub name: String,
    pub perms: BTreeSet<PermIndex>,
}
