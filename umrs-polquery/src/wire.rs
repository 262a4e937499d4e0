// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! The relabel-query result wire shape (§6): an ordered sequence of
//! `{ target_type_name, direction, via_subjects: [{ subject_name, rules }] }`
//! records, target types and subjects each in declaration order.
// ===========================================================================

use serde::Serialize;

use umrs_policy::relabel::Direction;
use umrs_policy::relabel_query::RelabelResult;
use umrs_policy::PolicyDb;

#[derive(Debug, Serialize)]
pub struct WireSubject {
    pub subject_name: String,
    pub rules: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct WireResult {
    pub target_type_name: String,
    pub direction: &'static str,
    pub via_subjects: Vec<WireSubject>,
}

fn type_name(db: &PolicyDb, idx: umrs_policy::ids::TypeIndex) -> String {
    db.types
        .lookup_by_index(idx)
        .map_or_else(|| format!("<unknown:{idx}>"), str::to_string)
}

fn direction_str(direction: Direction) -> &'static str {
    direction.as_str()
}

/// Translates component G's result list into the §6 wire shape, resolving
/// every `TypeIndex` back through the symbol table to its declared name
/// and mapping each witness rule to the source line it was declared on
/// (rules are referenced by their line number on the wire, not their
/// internal array index).
#[must_use]
pub fn to_wire(db: &PolicyDb, results: &[RelabelResult]) -> Vec<WireResult> {
    results
        .iter()
        .map(|result| WireResult {
            target_type_name: type_name(db, result.target_type),
            direction: direction_str(result.direction),
            via_subjects: result
                .via_subjects
                .iter()
                .map(|subject| WireSubject {
                    subject_name: type_name(db, subject.subject),
                    rules: subject
                        .rules
                        .iter()
                        .map(|&rule_idx| {
                            db.av_rules
                                .get(rule_idx as usize)
                                .map_or(rule_idx, |rule| rule.source_line)
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}
