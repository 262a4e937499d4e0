// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Ocontexts and initial SIDs (SPEC_FULL §3 supplement).
//!
//! These carry no TE rules and are not part of the rule-matching query
//! engine's predicate surface; they exist so `load_policy` has somewhere
//! to put every declaration kind a real expanded policy carries, and so
//! version inference (§4.B) has real data — an `fs_use` XATTR entry or an
//! IPv6 `nodecon` — to key off of.
// ===========================================================================

use umrs_selinux::SecurityContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsUseBehavior {
    /// Label derived from the filesystem's PSID (default behavior).
    Psid,
    /// Label read from an on-disk extended attribute.
    Xattr,
    /// Filesystem is always labeled with a single fixed context (`task`,
    /// `trans` behaviors in the incumbent collapse to this for our
    /// purposes — the distinction doesn't affect version inference).
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

#[derive(Debug, Clone)]
pub enum Ocontext {
    FsUse {
        filesystem: String,
        behavior: FsUseBehavior,
        context: SecurityContext,
    },
    Genfscon {
        filesystem: String,
        path_prefix: String,
        context: SecurityContext,
    },
    Netifcon {
        interface: String,
        if_context: SecurityContext,
        packet_context: SecurityContext,
    },
    Nodecon {
        family: AddressFamily,
        address: String,
        netmask: String,
        context: SecurityContext,
    },
    Port {
        protocol: String,
        low: u16,
        high: u16,
        context: SecurityContext,
    },
}

/// A named bootstrap security identifier assigned before any
/// type-transition rule can run.
#[derive(Debug, Clone)]
pub struct InitialSid {
    pub name: String,
    pub context: SecurityContext,
}
