// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Policy-version inference (§4.B).
//!
//! The minimum compatibility version is the lowest value in the table
//! below that is consistent with the declared features. Triggers are
//! checked from highest to lowest so the first hit wins.
// ===========================================================================

use crate::db::ocontext::{AddressFamily, FsUseBehavior, Ocontext};
use crate::db::PolicyDb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PolicyVersion(pub u32);

impl PolicyVersion {
    pub const MIN: Self = Self(12);
}

/// Infers the minimum policy version consistent with `db`'s declared
/// features, per the table in §4.B.
#[must_use]
pub fn infer_version(db: &PolicyDb) -> PolicyVersion {
    if db.mls_enabled || db.has_validatetrans {
        return PolicyVersion(19);
    }

    if db.classes.lookup_by_name("netlink_audit_socket").is_some() {
        return PolicyVersion(18);
    }

    if db.ocontexts.iter().any(|o| {
        matches!(
            o,
            Ocontext::Nodecon {
                family: AddressFamily::Ipv6,
                ..
            }
        )
    }) {
        return PolicyVersion(17);
    }

    if !db.booleans.is_empty() {
        return PolicyVersion(16);
    }

    if db.ocontexts.iter().any(|o| {
        matches!(
            o,
            Ocontext::FsUse {
                behavior: FsUseBehavior::Xattr,
                ..
            }
        )
    }) {
        return PolicyVersion(15);
    }

    PolicyVersion::MIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PolicyDb;

    #[test]
    fn empty_policy_infers_minimum_version() {
        let db = PolicyDb::new();
        assert_eq!(infer_version(&db), PolicyVersion::MIN);
    }

    #[test]
    fn declared_boolean_infers_version_16() {
        let mut db = PolicyDb::new();
        db.booleans.intern("secure_mode_on");
        assert_eq!(infer_version(&db), PolicyVersion(16));
    }

    #[test]
    fn ipv6_nodecon_infers_version_17() {
        let mut db = PolicyDb::new();
        db.booleans.intern("b");
        db.ocontexts.push(Ocontext::Nodecon {
            family: AddressFamily::Ipv6,
            address: "::1".to_string(),
            netmask: "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff".to_string(),
            context: umrs_selinux::SecurityContext::new(
                "system_u".parse().unwrap(),
                "object_r".parse().unwrap(),
                "node_t".parse().unwrap(),
                None,
            ),
        });
        assert_eq!(infer_version(&db), PolicyVersion(17));
    }
}
