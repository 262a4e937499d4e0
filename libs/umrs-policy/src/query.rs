// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Rule-matching query engine (component C, §4.C).
//!
//! Three predicates (`rule_references_type/class/perm`) and three
//! extractors (`expand_types/classes/perms`) operating on the [`TypeList`]
//! / [`RuleList`] shapes shared by every rule kind, plus clone-rule
//! resolution and the conjunctive compound filter. The predicate and
//! extractor logic is written once over the list shapes rather than
//! duplicated per rule kind (AV, type-transition, role-transition, ...),
//! since wildcard/complement/indirect-attribute semantics don't vary by
//! what the list happens to belong to.
// ===========================================================================

use std::collections::BTreeSet;

use crate::db::{AvRule, CloneRule, PolicyDb, RuleList, TypeList, TypeListEntry, TypeRule};
use crate::error::{PolicyError, PolicyResult};
use crate::ids::{ClassIndex, PermIndex, TypeIndex, SELF_TYPE};

/// Which of a rule's two type lists a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSelector {
    Source,
    Target,
}

/// Whether a type-list membership test should also expand attributes
/// indirectly (an attribute entry matches if the queried type is one of
/// its members).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndirectMode {
    Direct,
    Indirect,
}

/// Result status of an extractor (§4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandStatus {
    Ok,
    Wildcard,
    WildcardComplement,
}

#[derive(Debug, Clone)]
pub struct Expansion<T> {
    pub set: BTreeSet<T>,
    pub status: ExpandStatus,
}

impl<T: Ord> Expansion<T> {
    fn ok(set: BTreeSet<T>) -> Self {
        Self {
            set,
            status: ExpandStatus::Ok,
        }
    }
}

// ---------------------------------------------------------------------
// Predicate/extractor: types (and attributes, indirectly)
// ---------------------------------------------------------------------

fn attribute_contains(db: &PolicyDb, attr: crate::ids::AttrIndex, type_idx: TypeIndex) -> bool {
    db.attribute_decl(attr)
        .is_some_and(|decl| decl.type_set.contains(&type_idx))
}

/// `rule_references_type(list, type_idx, do_indirect)` (§4.C):
/// - the list has the `*` flag and `do_indirect` is true; or
/// - the list contains the literal `type_idx`; or
/// - (only if `do_indirect`) the list contains an attribute `A` with
///   `type_idx ∈ A.type_set`.
///
/// A complement mark on one entry inverts membership of that entry alone;
/// `*` plus `~Y` means "everything except Y" (so a complemented entry
/// still participates in the wildcard-exclusion test regardless of
/// `do_indirect` — the entry itself is a literal exclusion).
pub fn rule_references_type(
    db: &PolicyDb,
    list: &TypeList,
    type_idx: TypeIndex,
    indirect: IndirectMode,
) -> bool {
    if list.wildcard {
        let excluded = list.entries.iter().any(|e| match e {
            TypeListEntry::ComplementType(t) => *t == type_idx,
            TypeListEntry::ComplementAttr(a) => {
                indirect == IndirectMode::Indirect && attribute_contains(db, *a, type_idx)
            }
            TypeListEntry::Type(_) | TypeListEntry::Attr(_) => false,
        });
        return !excluded;
    }

    for entry in &list.entries {
        let matched = match entry {
            TypeListEntry::Type(t) | TypeListEntry::ComplementType(t) => *t == type_idx,
            TypeListEntry::Attr(a) | TypeListEntry::ComplementAttr(a) => {
                indirect == IndirectMode::Indirect && attribute_contains(db, *a, type_idx)
            }
        };
        if matched {
            return !entry.is_complement();
        }
    }
    false
}

/// `expand_types(list, do_indirect)` (§4.C): explodes attribute entries
/// into their type members, de-duplicates, substitutes `self` with the
/// caller-supplied source expansion (only meaningful on a target list —
/// see §3, §9), and reports `wildcard`/`wildcard_complement` without
/// materializing the full type universe when the list carries the
/// wildcard flag.
pub fn expand_types(
    db: &PolicyDb,
    list: &TypeList,
    self_substitution: Option<&BTreeSet<TypeIndex>>,
) -> Expansion<TypeIndex> {
    if list.wildcard {
        let has_complement = list.entries.iter().any(TypeListEntry::is_complement);
        return Expansion {
            set: BTreeSet::new(),
            status: if has_complement {
                ExpandStatus::WildcardComplement
            } else {
                ExpandStatus::Wildcard
            },
        };
    }

    let mut set = BTreeSet::new();
    for entry in &list.entries {
        match entry {
            TypeListEntry::Type(t) => {
                set.insert(*t);
            }
            TypeListEntry::Attr(a) => {
                if let Some(decl) = db.attribute_decl(*a) {
                    set.extend(decl.type_set.iter().copied());
                }
            }
            // A bare complement with no wildcard is only meaningful
            // paired with `*` (§3); it degenerates to "no contribution"
            // here rather than panicking.
            TypeListEntry::ComplementType(_) | TypeListEntry::ComplementAttr(_) => {}
        }
    }

    if list.has_self {
        if let Some(src_expansion) = self_substitution {
            set.extend(src_expansion.iter().copied());
        } else {
            set.insert(SELF_TYPE);
        }
    }

    Expansion::ok(set)
}

/// Every declared type, in declaration order. Used only where a consumer
/// genuinely needs a concrete set for a wildcard list (the relabel-set
/// builder's cartesian product, §4.F) rather than the O(1)
/// wildcard-preserving contract `expand_types` gives query callers.
#[must_use]
pub fn all_types(db: &PolicyDb) -> BTreeSet<TypeIndex> {
    db.types.iterate().map(|(idx, _)| idx).collect()
}

fn excluded_types(db: &PolicyDb, list: &TypeList) -> BTreeSet<TypeIndex> {
    let mut excluded = BTreeSet::new();
    for entry in &list.entries {
        match entry {
            TypeListEntry::ComplementType(t) => {
                excluded.insert(*t);
            }
            TypeListEntry::ComplementAttr(a) => {
                if let Some(decl) = db.attribute_decl(*a) {
                    excluded.extend(decl.type_set.iter().copied());
                }
            }
            TypeListEntry::Type(_) | TypeListEntry::Attr(_) => {}
        }
    }
    excluded
}

/// Like `expand_types`, but resolves wildcard/`wildcard_complement`
/// against the full type universe instead of reporting the status and
/// stopping. Used internally by the relabel-set builder (§4.F), which
/// needs a concrete set to iterate a cartesian product over; ordinary
/// query callers should prefer `expand_types` and handle the wildcard
/// status per §4.C.
#[must_use]
pub fn materialize_types(
    db: &PolicyDb,
    list: &TypeList,
    self_substitution: Option<&BTreeSet<TypeIndex>>,
) -> BTreeSet<TypeIndex> {
    let expansion = expand_types(db, list, self_substitution);
    match expansion.status {
        ExpandStatus::Ok => expansion.set,
        ExpandStatus::Wildcard => all_types(db),
        ExpandStatus::WildcardComplement => {
            let mut set = all_types(db);
            for excluded in excluded_types(db, list) {
                set.remove(&excluded);
            }
            set
        }
    }
}

// ---------------------------------------------------------------------
// Predicate/extractor: classes
// ---------------------------------------------------------------------

pub fn rule_references_class(list: &RuleList<ClassIndex>, classes: &BTreeSet<ClassIndex>) -> bool {
    if list.wildcard {
        return list.complements().all(|c| !classes.contains(&c));
    }
    list.literals().any(|c| classes.contains(&c))
        || list.complements().any(|c| !classes.contains(&c))
}

pub fn expand_classes(list: &RuleList<ClassIndex>) -> Expansion<ClassIndex> {
    if list.wildcard {
        let has_complement = !list.entries.is_empty();
        return Expansion {
            set: BTreeSet::new(),
            status: if has_complement {
                ExpandStatus::WildcardComplement
            } else {
                ExpandStatus::Wildcard
            },
        };
    }
    Expansion::ok(list.literals().collect())
}

#[must_use]
pub fn all_classes(db: &PolicyDb) -> BTreeSet<ClassIndex> {
    db.classes.iterate().map(|(idx, _)| idx).collect()
}

/// Like `expand_classes`, materializing wildcard/complement against the
/// full class universe; used internally by the relabel-set builder.
#[must_use]
pub fn materialize_classes(db: &PolicyDb, list: &RuleList<ClassIndex>) -> BTreeSet<ClassIndex> {
    let expansion = expand_classes(list);
    match expansion.status {
        ExpandStatus::Ok => expansion.set,
        ExpandStatus::Wildcard => all_classes(db),
        ExpandStatus::WildcardComplement => {
            let mut set = all_classes(db);
            for excluded in list.complements() {
                set.remove(&excluded);
            }
            set
        }
    }
}

// ---------------------------------------------------------------------
// Predicate/extractor: perms
// ---------------------------------------------------------------------

pub fn rule_references_perm(list: &RuleList<PermIndex>, perms: &BTreeSet<PermIndex>) -> bool {
    if list.wildcard {
        return list.complements().all(|p| !perms.contains(&p));
    }
    list.literals().any(|p| perms.contains(&p))
        || list.complements().any(|p| !perms.contains(&p))
}

/// `expand_perms(rule)` (§4.C): unions in every permission of a common
/// permission referenced by any class in the rule's expanded `class_set`,
/// but does not cross-pollinate permissions between classes that don't
/// name them. `*` returns `wildcard`; the caller re-expands per class.
pub fn expand_perms(
    db: &PolicyDb,
    perm_list: &RuleList<PermIndex>,
    class_set: &BTreeSet<ClassIndex>,
) -> Expansion<PermIndex> {
    if perm_list.wildcard {
        let has_complement = !perm_list.entries.is_empty();
        return Expansion {
            set: BTreeSet::new(),
            status: if has_complement {
                ExpandStatus::WildcardComplement
            } else {
                ExpandStatus::Wildcard
            },
        };
    }

    let mut set: BTreeSet<PermIndex> = perm_list.literals().collect();

    for class_idx in class_set {
        let Some(class_decl) = db.class_decl(*class_idx) else {
            continue;
        };
        let Some(common_idx) = class_decl.common_perm else {
            continue;
        };
        let Some(common_decl) = db.common_perm_decl(common_idx) else {
            continue;
        };
        for common_perm in &common_decl.perms {
            if set.contains(common_perm) || class_decl.unique_perms.contains(common_perm) {
                set.insert(*common_perm);
            }
        }
    }

    Expansion::ok(set)
}

/// The full legal permission universe for one class: `common_perm.perms ∪
/// unique_perms` (§3).
#[must_use]
pub fn class_all_perms(db: &PolicyDb, class_idx: ClassIndex) -> BTreeSet<PermIndex> {
    let Some(decl) = db.class_decl(class_idx) else {
        return BTreeSet::new();
    };
    let mut set = decl.unique_perms.clone();
    if let Some(common_idx) = decl.common_perm {
        if let Some(common_decl) = db.common_perm_decl(common_idx) {
            set.extend(common_decl.perms.iter().copied());
        }
    }
    set
}

/// Materializes the concrete permission set a rule grants for one
/// specific class, intersecting against that class's legal permission
/// universe rather than the cross-class union `expand_perms` computes —
/// used by the relabel-set builder (§4.F), which records perm_sets keyed
/// per class.
#[must_use]
pub fn materialize_perms_for_class(
    db: &PolicyDb,
    perm_list: &RuleList<PermIndex>,
    class_idx: ClassIndex,
) -> BTreeSet<PermIndex> {
    let universe = class_all_perms(db, class_idx);
    if perm_list.wildcard {
        let mut set = universe;
        for excluded in perm_list.complements() {
            set.remove(&excluded);
        }
        return set;
    }
    perm_list
        .literals()
        .filter(|p| universe.contains(p))
        .collect()
}

// ---------------------------------------------------------------------
// Clone resolution (§4.C, §9)
// ---------------------------------------------------------------------

/// Extends a source-type expansion with clone targets/sources per the
/// composition rule in §4.C: for every AV rule whose source references
/// `clone.src_type` and whose target expansion isn't `{src, tgt}` alone,
/// the clone's counterpart type is folded into the source set too.
///
/// The exception (grounded in `clone.c`'s `check_clone_specials_tt`):
/// `type_transition` rules whose class is `process` and whose default
/// type equals either the clone's source or target are never cloned —
/// callers performing this resolution for a `TypeRule` must check
/// `is_clone_suppressed_for_type_transition` first and skip this function
/// entirely when it returns `true`.
pub fn apply_clone_to_source_expansion(
    clones: &[CloneRule],
    target_expansion: &BTreeSet<TypeIndex>,
    source_expansion: &mut BTreeSet<TypeIndex>,
) {
    for clone in clones {
        let touches_src = source_expansion.contains(&clone.src_type);
        let touches_tgt = source_expansion.contains(&clone.tgt_type);
        if !touches_src && !touches_tgt {
            continue;
        }

        let is_only_pair = *target_expansion
            == [clone.src_type, clone.tgt_type].into_iter().collect::<BTreeSet<_>>();
        if is_only_pair {
            continue;
        }

        if touches_src {
            source_expansion.insert(clone.tgt_type);
        }
        if touches_tgt {
            source_expansion.insert(clone.src_type);
        }
    }
}

/// The `type_transition`/`process`/default-type suppression exception
/// (§4.C, grounded in `clone.c`'s `check_clone_specials_tt`).
#[must_use]
pub fn is_clone_suppressed_for_type_transition(
    db: &PolicyDb,
    clone: &CloneRule,
    type_rule: &TypeRule,
) -> bool {
    let is_process_class = type_rule
        .class_set
        .literals()
        .any(|c| db.class_decl(c).is_some_and(|decl| decl.name == "process"));
    if !is_process_class {
        return false;
    }
    type_rule.default_type == clone.src_type || type_rule.default_type == clone.tgt_type
}

/// Resolves an AV rule's effective source-type expansion, folding in any
/// clone counterpart per §4.C/§9. AV rules carry no `process`/default-type
/// exception (that applies only to `type_transition`), so cloning always
/// applies when the rule qualifies.
#[must_use]
pub fn av_rule_source_expansion(
    db: &PolicyDb,
    rule: &AvRule,
    clones: &[CloneRule],
) -> BTreeSet<TypeIndex> {
    let mut source = expand_types(db, &rule.src_set, None).set;
    let target = expand_types(db, &rule.tgt_set, Some(&source)).set;
    apply_clone_to_source_expansion(clones, &target, &mut source);
    source
}

// ---------------------------------------------------------------------
// Compound filters (§4.C)
// ---------------------------------------------------------------------

/// A conjunctive filter over type/class/permission dimensions. `None`
/// means that dimension is unconstrained.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub type_filter: Option<(TypeIndex, ListSelector, IndirectMode)>,
    pub class_filter: Option<BTreeSet<ClassIndex>>,
    pub perm_filter: Option<BTreeSet<PermIndex>>,
}

/// Evaluates the conjunctive filter against one AV rule.
pub fn matches_av_rule(db: &PolicyDb, rule: &AvRule, filter: &RuleFilter) -> PolicyResult<bool> {
    if let Some((type_idx, selector, indirect)) = filter.type_filter {
        let list = match selector {
            ListSelector::Source => &rule.src_set,
            ListSelector::Target => &rule.tgt_set,
        };
        if !rule_references_type(db, list, type_idx, indirect) {
            return Ok(false);
        }
    }

    if let Some(classes) = &filter.class_filter {
        if !rule_references_class(&rule.class_set, classes) {
            return Ok(false);
        }
    }

    if let Some(perms) = &filter.perm_filter {
        if !rule_references_perm(&rule.perm_set, perms) {
            return Ok(false);
        }
    }

    Ok(true)
}

#[must_use]
pub fn invalid_index_error(what: &str, idx: u32) -> PolicyError {
    PolicyError::InvalidArgument(format!("{what} index {idx} out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PolicyDbBuilder, TypeList};

    #[test]
    fn wildcard_absorption_returns_empty_set() {
        let list = TypeList::wildcard();
        let db = PolicyDbBuilder::new().build();
        let expansion = expand_types(&db, &list, None);
        assert_eq!(expansion.status, ExpandStatus::Wildcard);
        assert!(expansion.set.is_empty());
    }

    #[test]
    fn self_expansion_substitutes_source_set() {
        let mut builder = PolicyDbBuilder::new();
        let t1 = builder.intern_type("t1");
        let db = builder.build();

        let mut src_set: BTreeSet<TypeIndex> = BTreeSet::new();
        src_set.insert(t1);

        let tgt_list = TypeList::self_only();
        let expansion = expand_types(&db, &tgt_list, Some(&src_set));
        assert_eq!(expansion.set, src_set);
    }

    #[test]
    fn attribute_indirect_expansion_includes_members() {
        let mut builder = PolicyDbBuilder::new();
        let t1 = builder.intern_type("t1");
        let t2 = builder.intern_type("t2");
        let a = builder.intern_attribute("a");
        builder.add_type_to_attribute(t1, a).unwrap();
        builder.add_type_to_attribute(t2, a).unwrap();
        let db = builder.build();

        let mut list = TypeList::default();
        list.push_attr(a);
        let expansion = expand_types(&db, &list, None);
        assert_eq!(expansion.set.len(), 2);
        assert!(expansion.set.contains(&t1));
        assert!(expansion.set.contains(&t2));
    }

    #[test]
    fn complement_excludes_single_type_from_wildcard() {
        let mut builder = PolicyDbBuilder::new();
        let t1 = builder.intern_type("t1");
        let t2 = builder.intern_type("t2");
        let db = builder.build();

        let mut list = TypeList::wildcard();
        list.push_complement_type(t2);

        assert!(rule_references_type(&db, &list, t1, IndirectMode::Direct));
        assert!(!rule_references_type(&db, &list, t2, IndirectMode::Direct));
    }

    #[test]
    fn clone_suppressed_for_process_type_transition_default_matching_src() {
        let mut builder = PolicyDbBuilder::new();
        let src = builder.intern_type("src_t");
        let tgt = builder.intern_type("tgt_t");
        let process_class = builder.intern_class("process", 1, None);
        let db = builder.build();

        let clone = CloneRule {
            src_type: src,
            tgt_type: tgt,
            source_line: 1,
        };
        let tt_rule = TypeRule {
            kind: crate::db::TypeRuleKind::TypeTransition,
            flags: crate::db::RuleFlags::NONE,
            source_line: 2,
            src_set: TypeList::literal_types([src]),
            tgt_set: TypeList::literal_types([tgt]),
            class_set: RuleList::literal([process_class]),
            default_type: src,
        };

        assert!(is_clone_suppressed_for_type_transition(&db, &clone, &tt_rule));
    }
}
