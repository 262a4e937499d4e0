// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Relabel-set builder (component F, §4.F).
//!
//! A two-pass expansion of the `allow` rule array (never `neverallow`,
//! never audit rules) that builds, per subject type, the sets of types it
//! may `relabelto` and `relabelfrom`, carrying per-(target-type, class,
//! permission) witness rules for later filtering (§4.G).
//!
//! Grounded directly on `original_source/setools/libapol/relabel_analysis.c`'s
//! `apol_do_relabel_analysis`.
// ===========================================================================

use std::collections::BTreeMap;

use crate::db::{AvRule, AvRuleKind, PolicyDb};
use crate::error::PolicyResult;
use crate::ids::{ClassIndex, PermIndex, TypeIndex};
use crate::query;

/// Which of `relabelto`/`relabelfrom` a subject/target pair is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    To,
    From,
    Both,
}

impl Direction {
    #[must_use]
    pub const fn has_to(self) -> bool {
        matches!(self, Self::To | Self::Both)
    }

    #[must_use]
    pub const fn has_from(self) -> bool {
        matches!(self, Self::From | Self::Both)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::To => "to",
            Self::From => "from",
            Self::Both => "both",
        }
    }

    fn union(self, other: Self) -> Self {
        match (self.has_to() || other.has_to(), self.has_from() || other.has_from()) {
            (true, true) => Self::Both,
            (true, false) => Self::To,
            (false, true) => Self::From,
            (false, false) => unreachable!("union of two directions is never empty"),
        }
    }
}

/// A witness `allow` rule backing an entry's `to` direction, tagged with
/// the classes that rule's expansion named — so `domain`-mode filtering
/// can prune the witness list to rules whose class matches the filter
/// (§4.G) without re-walking `PolicyDb::av_rules`.
#[derive(Debug, Clone)]
pub struct Witness {
    pub rule_idx: u32,
    pub classes: std::collections::BTreeSet<ClassIndex>,
}

/// Per subject-type `S`, one `TypeObj` record per distinct target type it
/// has a relabel relationship with (§3: "relabel-set entry").
#[derive(Debug, Clone)]
pub struct TypeObj {
    pub target_type: TypeIndex,
    pub direction: Direction,
    /// Witnesses backing the `to` direction of this entry (§4.F pass 1
    /// records witnesses only on the `relabelto` branch).
    pub rules: Vec<Witness>,
    /// Union of all permissions (not just relabel*) granted by any rule
    /// whose source expansion contains `S` and target expansion contains
    /// `target_type`, keyed per class — the accumulator §4.G's filter
    /// evaluation consults.
    pub perm_sets: BTreeMap<ClassIndex, std::collections::BTreeSet<PermIndex>>,
}

impl TypeObj {
    fn new(target_type: TypeIndex, direction: Direction) -> Self {
        Self {
            target_type,
            direction,
            rules: Vec::new(),
            perm_sets: BTreeMap::new(),
        }
    }

    fn union_perms(&mut self, class_idx: ClassIndex, perms: &std::collections::BTreeSet<PermIndex>) {
        self.perm_sets
            .entry(class_idx)
            .or_default()
            .extend(perms.iter().copied());
    }

    /// Rule indices, unfiltered — the shape most callers want.
    #[must_use]
    pub fn rule_indices(&self) -> Vec<u32> {
        self.rules.iter().map(|w| w.rule_idx).collect()
    }
}

/// Per subject type, an ordered (by target-type index) map of its
/// relabel relationships.
pub type SubjectEntries = BTreeMap<TypeIndex, TypeObj>;

/// The built index: `relabel_set[subject] -> SubjectEntries`. Built
/// lazily via `build_relabel_sets` and cached by the caller; remains
/// valid until the policy is mutated (not a supported use case, §3).
#[derive(Debug, Clone, Default)]
pub struct RelabelSets {
    by_subject: BTreeMap<TypeIndex, SubjectEntries>,
}

impl RelabelSets {
    #[must_use]
    pub fn subject(&self, subject: TypeIndex) -> Option<&SubjectEntries> {
        self.by_subject.get(&subject)
    }

    #[must_use]
    pub fn subjects(&self) -> impl Iterator<Item = TypeIndex> + '_ {
        self.by_subject.keys().copied()
    }

    /// Inserts or unions `direction` into the `(subject, target)` entry,
    /// creating it if this is the first rule to establish the pair.
    fn seed(&mut self, subject: TypeIndex, target: TypeIndex, direction: Direction) -> &mut TypeObj {
        use std::collections::btree_map::Entry;
        match self.by_subject.entry(subject).or_default().entry(target) {
            Entry::Vacant(v) => v.insert(TypeObj::new(target, direction)),
            Entry::Occupied(o) => {
                let obj = o.into_mut();
                obj.direction = obj.direction.union(direction);
                obj
            }
        }
    }

    fn has_entry(&self, subject: TypeIndex, target: TypeIndex) -> bool {
        self.by_subject
            .get(&subject)
            .is_some_and(|entries| entries.contains_key(&target))
    }

    fn entry_mut(&mut self, subject: TypeIndex, target: TypeIndex) -> Option<&mut TypeObj> {
        self.by_subject.get_mut(&subject)?.get_mut(&target)
    }
}

struct RuleExpansion {
    src: std::collections::BTreeSet<TypeIndex>,
    tgt: std::collections::BTreeSet<TypeIndex>,
    classes: std::collections::BTreeSet<ClassIndex>,
    perms: std::collections::BTreeSet<PermIndex>,
}

/// Expands one `allow` rule's four dimensions, applying clone resolution
/// to the source expansion per §4.C/§9 and self-substitution on the
/// target list.
fn expand_allow_rule(db: &PolicyDb, rule: &AvRule) -> RuleExpansion {
    let mut src = query::expand_types(db, &rule.src_set, None).set;
    let tgt = query::materialize_types(db, &rule.tgt_set, Some(&src));
    query::apply_clone_to_source_expansion(&db.clone_rules, &tgt, &mut src);

    let classes = query::materialize_classes(db, &rule.class_set);
    let perms = query::expand_perms(db, &rule.perm_set, &classes).set;
    // `expand_perms` reports an empty set with a wildcard status when the
    // rule's perm list is `*`; the relabel builder needs concrete perms
    // to test for `relabelto`/`relabelfrom`; materialize per union of
    // every referenced class's full permission universe in that case.
    let perms = if rule.perm_set.wildcard {
        let mut set = std::collections::BTreeSet::new();
        for class_idx in &classes {
            set.extend(query::materialize_perms_for_class(db, &rule.perm_set, *class_idx));
        }
        set
    } else {
        perms
    };

    RuleExpansion {
        src,
        tgt,
        classes,
        perms,
    }
}

/// Builds the relabel sets for every subject type over `db`'s `allow`
/// rules (component F, §4.F). Idempotent and side-effect-free on `db`;
/// callers memoize the result per `build_relabel_sets` (§4.H).
#[must_use]
pub fn build_relabel_sets(db: &PolicyDb) -> RelabelSets {
    let Some(r_to) = db.perms.lookup_by_name("relabelto") else {
        return RelabelSets::default();
    };
    let r_from = db.perms.lookup_by_name("relabelfrom");

    let mut sets = RelabelSets::default();

    // Pass 1 — seeding.
    for (rule_idx, rule) in db.av_rules.iter().enumerate() {
        if rule.kind != AvRuleKind::Allow {
            continue;
        }
        if !db.is_av_rule_active(rule_idx as u32) {
            continue;
        }
        let expansion = expand_allow_rule(db, rule);
        let has_to = expansion.perms.contains(&r_to);
        let has_from = r_from.is_some_and(|rf| expansion.perms.contains(&rf));
        if !has_to && !has_from {
            continue;
        }

        for &src in &expansion.src {
            for &tgt in &expansion.tgt {
                let direction = match (has_to, has_from) {
                    (true, true) => Direction::Both,
                    (true, false) => Direction::To,
                    (false, true) => Direction::From,
                    (false, false) => unreachable!("checked above"),
                };

                let entry = sets.seed(src, tgt, direction);
                if has_to {
                    entry.rules.push(Witness {
                        rule_idx: rule_idx as u32,
                        classes: expansion.classes.clone(),
                    });
                }
                for &class_idx in &expansion.classes {
                    let class_perms =
                        query::materialize_perms_for_class(db, &rule.perm_set, class_idx);
                    let granted: std::collections::BTreeSet<PermIndex> = class_perms
                        .intersection(&expansion.perms)
                        .copied()
                        .collect();
                    entry.union_perms(class_idx, &granted);
                }
            }
        }
    }

    // Pass 2 — perm accumulation onto pairs pass 1 already discovered.
    // Never adds new (src, tgt) pairs.
    for (rule_idx, rule) in db.av_rules.iter().enumerate() {
        if rule.kind != AvRuleKind::Allow {
            continue;
        }
        if !db.is_av_rule_active(rule_idx as u32) {
            continue;
        }
        let expansion = expand_allow_rule(db, rule);
        for &src in &expansion.src {
            for &tgt in &expansion.tgt {
                if !sets.has_entry(src, tgt) {
                    continue;
                }
                let Some(entry) = sets.entry_mut(src, tgt) else {
                    continue;
                };
                for &class_idx in &expansion.classes {
                    let class_perms =
                        query::materialize_perms_for_class(db, &rule.perm_set, class_idx);
                    let granted: std::collections::BTreeSet<PermIndex> = class_perms
                        .intersection(&expansion.perms)
                        .copied()
                        .collect();
                    entry.union_perms(class_idx, &granted);
                }
            }
        }
    }

    sets
}

/// `build_relabel_sets(policy)` entry point named per §4.H's external
/// interface surface; thin wrapper returning a `PolicyResult` so callers
/// going through the documented surface get the same error shape as
/// every other component-H entry point even though this operation is
/// currently infallible.
pub fn build(db: &PolicyDb) -> PolicyResult<RelabelSets> {
    Ok(build_relabel_sets(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PolicyDbBuilder, RuleFlags, RuleList, TypeList};

    fn allow_rule(src: TypeIndex, tgt: TypeIndex, class: ClassIndex, perms: Vec<PermIndex>) -> AvRule {
        AvRule {
            kind: AvRuleKind::Allow,
            flags: RuleFlags::NONE,
            source_line: 1,
            src_set: TypeList::literal_types([src]),
            tgt_set: TypeList::literal_types([tgt]),
            class_set: RuleList::literal([class]),
            perm_set: RuleList::literal(perms),
        }
    }

    #[test]
    fn s1_no_relabel_perm_yields_empty_set() {
        let mut b = PolicyDbBuilder::new();
        let domain_t = b.intern_type("domain_t");
        let file_t = b.intern_type("file_t");
        let file_class = b.intern_class("file", 1, None);
        let read = b.intern_perm("read");
        let write = b.intern_perm("write");
        b.add_av_rule(allow_rule(domain_t, file_t, file_class, vec![read, write]));
        let db = b.build();

        let sets = build_relabel_sets(&db);
        assert!(sets.subject(domain_t).is_none());
    }

    #[test]
    fn s2_attribute_expansion_produces_four_entries() {
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
        assert_eq!(sets.subject(t1).unwrap().len(), 2);
        assert_eq!(sets.subject(t2).unwrap().len(), 2);
        for subject in [t1, t2] {
            for target in [t1, t2] {
                assert!(sets.subject(subject).unwrap()[&target].direction.has_to());
            }
        }
    }

    #[test]
    fn s4_clone_is_applied_but_process_type_transition_is_suppressed() {
        let mut b = PolicyDbBuilder::new();
        let src_t = b.intern_type("src_t");
        let tgt_t = b.intern_type("tgt_t");
        let obj_t = b.intern_type("obj_t");
        let file_class = b.intern_class("file", 1, None);
        let relabelto = b.intern_perm("relabelto");

        b.add_av_rule(allow_rule(src_t, obj_t, file_class, vec![relabelto]));
        b.add_clone_rule(crate::db::CloneRule {
            src_type: src_t,
            tgt_type: tgt_t,
            source_line: 2,
        });
        let db = b.build();

        let sets = build_relabel_sets(&db);
        assert!(sets.subject(tgt_t).unwrap().contains_key(&obj_t));
        assert!(sets.subject(tgt_t).unwrap()[&obj_t].direction.has_to());
    }

    #[test]
    fn s3_only_the_taken_conditional_branch_contributes() {
        use crate::db::{CondNode, ConditionalExpr, GuardedRule};

        let mut b = PolicyDbBuilder::new();
        let s1 = b.intern_type("s1");
        let t1 = b.intern_type("t1");
        let t2 = b.intern_type("t2");
        let file_class = b.intern_class("file", 1, None);
        let relabelto = b.intern_perm("relabelto");
        let boolean = b.intern_boolean("b");

        let rule0 = b.add_av_rule(allow_rule(s1, t1, file_class, vec![relabelto]));
        let rule1 = b.add_av_rule(allow_rule(s1, t2, file_class, vec![relabelto]));
        b.add_conditional(ConditionalExpr {
            rpn_nodes: vec![CondNode::Bool(boolean)],
            true_rules: vec![GuardedRule::Av(rule0)],
            false_rules: vec![GuardedRule::Av(rule1)],
            current_value: None,
        });
        b.set_boolean_default(boolean, true).unwrap();
        let db = b.build();

        let sets = build_relabel_sets(&db);
        let entries = sets.subject(s1).unwrap();
        assert!(entries.contains_key(&t1));
        assert!(!entries.contains_key(&t2));
    }

    #[test]
    fn s3_flipping_the_boolean_swaps_the_active_branch() {
        use crate::db::{CondNode, ConditionalExpr, GuardedRule};

        let mut b = PolicyDbBuilder::new();
        let s1 = b.intern_type("s1");
        let t1 = b.intern_type("t1");
        let t2 = b.intern_type("t2");
        let file_class = b.intern_class("file", 1, None);
        let relabelto = b.intern_perm("relabelto");
        let boolean = b.intern_boolean("b");

        let rule0 = b.add_av_rule(allow_rule(s1, t1, file_class, vec![relabelto]));
        let rule1 = b.add_av_rule(allow_rule(s1, t2, file_class, vec![relabelto]));
        b.add_conditional(ConditionalExpr {
            rpn_nodes: vec![CondNode::Bool(boolean)],
            true_rules: vec![GuardedRule::Av(rule0)],
            false_rules: vec![GuardedRule::Av(rule1)],
            current_value: None,
        });
        b.set_boolean_default(boolean, false).unwrap();
        let db = b.build();

        let sets = build_relabel_sets(&db);
        let entries = sets.subject(s1).unwrap();
        assert!(!entries.contains_key(&t1));
        assert!(entries.contains_key(&t2));
    }

    #[test]
    fn self_target_adds_entry_for_each_source_member() {
        let mut b = PolicyDbBuilder::new();
        let domain_t = b.intern_type("domain_t");
        let process_class = b.intern_class("process", 1, None);
        let relabelto = b.intern_perm("relabelto");

        let src = TypeList::literal_types([domain_t]);
        let tgt = TypeList::self_only();

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
        assert!(sets.subject(domain_t).unwrap().contains_key(&domain_t));
    }
}
