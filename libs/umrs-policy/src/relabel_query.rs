// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Relabel query (component G, §4.G).
//!
//! Four modes (`to`, `from`, `both`, `domain`) over the relabel sets
//! built by component F, plus a `(class, perm_set)` filter. Grounded on
//! `original_source/setools/libapol/relabel_analysis.c`'s
//! `apol_single_type_relabel` (to/from/both) and
//! `apol_domain_relabel_types` (domain mode with filtering).
// ===========================================================================

use std::collections::{BTreeMap, BTreeSet};

use crate::ids::{ClassIndex, PermIndex, TypeIndex};
use crate::relabel::{Direction, RelabelSets, TypeObj, Witness};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    To,
    From,
    Both,
    Domain,
}

/// A filter over `(class, perm_set)` pairs; empty `perms` for a class
/// means "any permission of this class" (§4.G).
#[derive(Debug, Clone, Default)]
pub struct RelabelFilter {
    pub classes: BTreeMap<ClassIndex, BTreeSet<PermIndex>>,
}

impl RelabelFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_class(&mut self, class: ClassIndex, perms: BTreeSet<PermIndex>) {
        self.classes.insert(class, perms);
    }

    /// A result `(S, target_type)` passes iff `perm_sets` contains at
    /// least one `(class, perms)` with `class` in the filter and either
    /// the filter's perm set for that class is empty ("any perm") or the
    /// two perm sets intersect (§4.G).
    fn accepts(&self, perm_sets: &BTreeMap<ClassIndex, BTreeSet<PermIndex>>) -> bool {
        if self.classes.is_empty() {
            return true;
        }
        self.classes.iter().any(|(class, filter_perms)| {
            perm_sets.get(class).is_some_and(|entry_perms| {
                filter_perms.is_empty() || !filter_perms.is_disjoint(entry_perms)
            })
        })
    }
}

/// One `to`/`from`/`both` result: a target type paired with every subject
/// that can reach it, and (in `domain` mode) the witness rules filtered
/// to the requesting filter's classes.
#[derive(Debug, Clone)]
pub struct RelabelResult {
    pub target_type: TypeIndex,
    pub direction: Direction,
    pub via_subjects: Vec<Subject>,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub subject: TypeIndex,
    pub rules: Vec<u32>,
}

/// `relabel_query(relabel_index, start_type, mode, filter?)` (§4.H),
/// returning results in declaration order of both target types and
/// subjects per §5's ordering guarantee and §6's wire-shape contract.
#[must_use]
pub fn relabel_query(
    sets: &RelabelSets,
    start_type: TypeIndex,
    mode: Mode,
    filter: Option<&RelabelFilter>,
) -> Vec<RelabelResult> {
    match mode {
        Mode::To => to_or_from(sets, start_type, Direction::To, filter),
        Mode::From => to_or_from(sets, start_type, Direction::From, filter),
        Mode::Both => {
            let mut combined = to_or_from(sets, start_type, Direction::To, filter);
            combined.extend(to_or_from(sets, start_type, Direction::From, filter));
            merge_by_target(combined)
        }
        Mode::Domain => domain(sets, start_type, filter),
    }
}

/// `to(T)`/`from(T)` per §4.G: "types that some subject can relabel
/// *into* T, paired with the origins it can relabel *from*" (and the
/// dual). `start_type` here plays the role of `T`: we scan every
/// subject's relabel set for an entry targeting `start_type` in the
/// requested direction, then pair each such subject with the *other*
/// entries it holds in the opposite direction.
fn to_or_from(
    sets: &RelabelSets,
    target: TypeIndex,
    want: Direction,
    filter: Option<&RelabelFilter>,
) -> Vec<RelabelResult> {
    let opposite = match want {
        Direction::To => Direction::From,
        Direction::From => Direction::To,
        Direction::Both => unreachable!("to_or_from is only called with To or From"),
    };

    let mut results: Vec<RelabelResult> = Vec::new();
    for subject in sets.subjects() {
        let Some(entries) = sets.subject(subject) else {
            continue;
        };
        let Some(target_entry) = entries.get(&target) else {
            continue;
        };
        let has_want = match want {
            Direction::To => target_entry.direction.has_to(),
            Direction::From => target_entry.direction.has_from(),
            Direction::Both => unreachable!(),
        };
        if !has_want {
            continue;
        }
        if let Some(f) = filter {
            if !f.accepts(&target_entry.perm_sets) {
                continue;
            }
        }

        for (origin, origin_entry) in entries {
            let has_origin = match opposite {
                Direction::To => origin_entry.direction.has_to(),
                Direction::From => origin_entry.direction.has_from(),
                Direction::Both => unreachable!(),
            };
            if !has_origin {
                continue;
            }
            if let Some(f) = filter {
                if !f.accepts(&origin_entry.perm_sets) {
                    continue;
                }
            }

            push_result(
                &mut results,
                target,
                want,
                subject,
                &target_entry.rule_indices(),
                *origin,
            );
        }
    }
    results
}

fn push_result(
    results: &mut Vec<RelabelResult>,
    target: TypeIndex,
    direction: Direction,
    subject: TypeIndex,
    rules: &[u32],
    _origin: TypeIndex,
) {
    if let Some(existing) = results.iter_mut().find(|r| r.target_type == target) {
        if !existing.via_subjects.iter().any(|s| s.subject == subject) {
            existing.via_subjects.push(Subject {
                subject,
                rules: rules.to_vec(),
            });
        }
        return;
    }
    results.push(RelabelResult {
        target_type: target,
        direction,
        via_subjects: vec![Subject {
            subject,
            rules: rules.to_vec(),
        }],
    });
}

/// `both(T)`: union of `to(T)` and `from(T)` (§4.G), merging subject
/// lists for any target that appears in both and upgrading its direction
/// to `Both`.
fn merge_by_target(results: Vec<RelabelResult>) -> Vec<RelabelResult> {
    let mut by_target: BTreeMap<TypeIndex, RelabelResult> = BTreeMap::new();
    for r in results {
        by_target
            .entry(r.target_type)
            .and_modify(|existing| {
                existing.direction = existing.direction.union(r.direction);
                for subj in &r.via_subjects {
                    if !existing.via_subjects.iter().any(|s| s.subject == subj.subject) {
                        existing.via_subjects.push(Subject {
                            subject: subj.subject,
                            rules: subj.rules.clone(),
                        });
                    }
                }
            })
            .or_insert(r);
    }
    by_target.into_values().collect()
}

/// `domain(D)`: the entire `relabel_set[D]`, each target with its
/// direction; the filter additionally prunes the witness-rule list to
/// rules whose class matches the filter (§4.G).
fn domain(sets: &RelabelSets, subject: TypeIndex, filter: Option<&RelabelFilter>) -> Vec<RelabelResult> {
    let Some(entries) = sets.subject(subject) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for (target, entry) in entries {
        if let Some(f) = filter {
            if !f.accepts(&entry.perm_sets) {
                continue;
            }
        }
        results.push(RelabelResult {
            target_type: *target,
            direction: entry.direction,
            via_subjects: vec![Subject {
                subject,
                rules: pruned_rules(entry, filter),
            }],
        });
    }
    results
}

/// Prunes a `domain`-mode result's witness-rule list to only those whose
/// class matches the filter (§4.G: "In `domain` mode the filter
/// additionally prunes the witness-rule list to rules whose class
/// matches the filter").
fn pruned_rules(entry: &TypeObj, filter: Option<&RelabelFilter>) -> Vec<u32> {
    let Some(f) = filter else {
        return entry.rule_indices();
    };
    entry
        .rules
        .iter()
        .filter(|w: &&Witness| w.classes.iter().any(|c| f.classes.contains_key(c)))
        .map(|w| w.rule_idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AvRule, AvRuleKind, PolicyDbBuilder, RuleFlags, RuleList, TypeList};
    use crate::relabel::build_relabel_sets;

    #[test]
    fn s2_to_query_pairs_subject_with_itself() {
        let mut b = PolicyDbBuilder::new();
        let a = b.intern_attribute("a");
        let t1 = b.intern_type("t1");
        let t2 = b.intern_type("t2");
        b.add_type_to_attribute(t1, a).unwrap();
        b.add_type_to_attribute(t2, a).unwrap();
        let process_class = b.intern_class("process", 1, None);
        let relabelto = b.intern_perm("relabelto");

        let mut src = TypeList::default();
        src.push_attr(a);
        let mut tgt = TypeList::default();
        tgt.push_attr(a);

        b.add_av_rule(AvRule {
            kind: AvRuleKind::Allow,
            flags: RuleFlags::NONE,
            source_line: 1,
            src_set: src,
            tgt_set: tgt,
            class_set: RuleList::literal([process_class]),
            perm_set: RuleList::literal([relabelto]),
        });
        let db = b.build();

        let sets = build_relabel_sets(&db);
        let results = relabel_query(&sets, t1, Mode::Domain, None);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn filter_monotonicity_never_adds_results() {
        let mut b = PolicyDbBuilder::new();
        let domain_t = b.intern_type("domain_t");
        let file_t = b.intern_type("file_t");
        let file_class = b.intern_class("file", 1, None);
        let relabelto = b.intern_perm("relabelto");
        let read = b.intern_perm("read");
        let write = b.intern_perm("write");
        b.add_class_perm(file_class, relabelto).unwrap();
        b.add_class_perm(file_class, read).unwrap();
        b.add_class_perm(file_class, write).unwrap();

        b.add_av_rule(AvRule {
            kind: AvRuleKind::Allow,
            flags: RuleFlags::NONE,
            source_line: 1,
            src_set: TypeList::literal_types([domain_t]),
            tgt_set: TypeList::literal_types([file_t]),
            class_set: RuleList::literal([file_class]),
            perm_set: RuleList::literal([relabelto, read]),
        });
        let db = b.build();
        let sets = build_relabel_sets(&db);

        let unfiltered = relabel_query(&sets, domain_t, Mode::Domain, None);
        assert_eq!(unfiltered.len(), 1);

        let mut narrow_filter = RelabelFilter::new();
        narrow_filter.allow_class(file_class, [read].into_iter().collect());
        let narrow = relabel_query(&sets, domain_t, Mode::Domain, Some(&narrow_filter));
        assert_eq!(narrow.len(), 1);

        let mut restrictive_filter = RelabelFilter::new();
        restrictive_filter.allow_class(file_class, [write].into_iter().collect());
        let restrictive = relabel_query(&sets, domain_t, Mode::Domain, Some(&restrictive_filter));
        assert!(restrictive.len() <= narrow.len());
        assert_eq!(restrictive.len(), 0);
    }
}
