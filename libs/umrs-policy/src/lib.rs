// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
//
//! # UMRS Policy Analysis Library
//!
//! - Project: Unclassified MLS Reference System (exploring CUI)
//!
//! This crate is the core of the UMRS policy toolchain: an in-memory
//! representation of an expanded SELinux-style policy (component B), the
//! interned symbol tables it is built from (component A), a rule-matching
//! query engine (component C), a permission map (component D), a
//! conditional-expression evaluator (component E), and the relabel-set
//! builder and query (components F, G) that together answer "starting
//! from type T, what can T relabel to/from, and via which rules".
//!
//! It consumes an already-expanded policy handed to it through
//! [`db::PolicyDbBuilder`] — parsing a source policy language or a binary
//! kernel policy image is an external adapter's job, not this crate's.
//!
//! ## Implementation Lineage & Design Note
//!
//! This crate provides an independent, original implementation of query
//! and analysis semantics conceptually comparable to traditional SELinux
//! policy-analysis tooling (`libapol`/`libqpol`'s rule-matching and
//! relabel-analysis routines). Behavioral interfaces and algorithms were
//! studied to preserve the same observable results a long-time user of
//! that tooling would expect; no source was copied or translated line by
//! line.
// ===========================================================================
#![allow(clippy::unreadable_literal)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod condeval;
pub mod db;
pub mod error;
pub mod ids;
pub mod permmap;
pub mod query;
pub mod relabel;
pub mod relabel_query;
pub mod symtab;

pub use db::{PolicyDb, PolicyDbBuilder};
pub use error::{MessageSink, PolicyError, PolicyResult, Severity};

/// A compiled-in default permission map covering the `file`/`dir`/`process`
/// classes' most common permissions (SPEC_FULL §4.D supplement), consulted
/// by callers (the `umrs-polquery` CLI) when the §6 environment search
/// path finds no on-disk map.
pub const DEFAULT_PERM_MAP: &str = include_str!("../assets/default_perm_map.txt");

/// `load_policy(source) -> policy | error` (§4.H).
///
/// The core does not parse a source policy language or a binary kernel
/// image — that is an external loader's job. A loader builds a policy
/// incrementally through [`PolicyDbBuilder`] and calls this function to
/// finalize it into the frozen, read-only [`PolicyDb`] every other
/// component operates on. Provided as a named entry point so callers
/// going through the documented §4.H surface don't need to know that
/// `PolicyDbBuilder::build` is, today, infallible.
pub fn load_policy(builder: PolicyDbBuilder) -> PolicyResult<PolicyDb> {
    Ok(builder.build())
}

/// `query_rules(criteria) -> iterator<rule_idx>` (§4.H).
///
/// Applies a [`query::RuleFilter`] across every `allow`/`neverallow`/
/// `auditallow`/`dontaudit`/`auditdeny` rule in `db`, returning the
/// indices (into [`PolicyDb::av_rules`]) of the rules that satisfy every
/// constrained dimension, in declaration order (§5's ordering guarantee).
pub fn query_rules(db: &PolicyDb, filter: &query::RuleFilter) -> PolicyResult<Vec<u32>> {
    let mut matches = Vec::new();
    for (idx, rule) in db.av_rules.iter().enumerate() {
        let idx = idx as u32;
        if !db.is_av_rule_active(idx) {
            continue;
        }
        if query::matches_av_rule(db, rule, filter)? {
            matches.push(idx);
        }
    }
    Ok(matches)
}

/// `build_relabel_sets(policy) -> relabel_index` (§4.H). Idempotent and
/// side-effect-free on `db`; callers are expected to memoize the result
/// themselves (§3: "built lazily on first query; remain valid until
/// policy is destroyed").
pub fn build_relabel_sets(db: &PolicyDb) -> PolicyResult<relabel::RelabelSets> {
    relabel::build(db)
}

/// `relabel_query(relabel_index, start_type, mode, filter?) -> result`
/// (§4.H).
#[must_use]
pub fn relabel_query(
    sets: &relabel::RelabelSets,
    start_type: ids::TypeIndex,
    mode: relabel_query::Mode,
    filter: Option<&relabel_query::RelabelFilter>,
) -> Vec<relabel_query::RelabelResult> {
    relabel_query::relabel_query(sets, start_type, mode, filter)
}

/// `load_permission_map(text) -> perm_map` (§4.H).
pub fn load_permission_map(
    text: &str,
    known_classes: &[&str],
    known_perms: &[(&str, &str)],
    sink: &mut MessageSink,
) -> Result<permmap::PermissionMap, permmap::PermMapError> {
    permmap::load_permission_map(text, known_classes, known_perms, sink)
}

/// `save_permission_map(perm_map) -> text` (§4.H).
#[must_use]
pub fn save_permission_map(map: &permmap::PermissionMap) -> String {
    permmap::save_permission_map(map)
}

/// `evaluate_condition(expr, bool_values) -> tri_bool` (§4.H).
#[must_use]
pub fn evaluate_condition(
    rpn_nodes: &[db::CondNode],
    bool_values: &dyn Fn(ids::BoolIndex) -> Option<bool>,
) -> condeval::TriBool {
    condeval::evaluate(rpn_nodes, bool_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_policy_is_infallible_round_trip() {
        let mut builder = PolicyDbBuilder::new();
        builder.intern_type("domain_t");
        let db = load_policy(builder).expect("load_policy never fails today");
        assert_eq!(db.types.len(), 1);
    }

    #[test]
    fn default_perm_map_is_non_empty_and_parses() {
        assert!(!DEFAULT_PERM_MAP.is_empty());
        let mut sink = MessageSink::stderr_fallback();
        let map = load_permission_map(DEFAULT_PERM_MAP, &[], &[], &mut sink)
            .expect("bundled default perm map must parse");
        assert_ne!(map.get("file", "read").access, permmap::Access::Unmapped);
    }
}
