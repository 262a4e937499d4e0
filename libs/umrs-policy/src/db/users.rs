// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! User declarations (§3). MLS fields are present iff the policy is MLS.
// ===========================================================================

use std::collections::BTreeSet;

use crate::ids::RoleIndex;

#[derive(Debug, Clone, Default)]
pub struct UserDecl {
    pub name: String,
    pub role_set: BTreeSet<RoleIndex>,
    pub mls_default_level: Option<umrs_selinux::MlsLevel>,
    pub mls_range: Option<umrs_selinux::MlsRange>,
}
