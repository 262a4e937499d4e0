// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
// Cross-component scenarios and the universally-quantified properties,
// driven entirely through the public `umrs_policy` surface rather than
// any single component's internals.
// ===========================================================================

use umrs_policy::db::{
    AvRule, AvRuleKind, CloneRule, CondNode, ConditionalExpr, GuardedRule, PolicyDbBuilder,
    RuleFlags, RuleList, TypeList, TypeRule, TypeRuleKind,
};
use umrs_policy::error::MessageSink;
use umrs_policy::permmap::Access;
use umrs_policy::query::{IndirectMode, ListSelector, RuleFilter};
use umrs_policy::relabel_query::{Mode, RelabelFilter};

fn allow_rule(
    src: umrs_policy::ids::TypeIndex,
    tgt: umrs_policy::ids::TypeIndex,
    class: umrs_policy::ids::ClassIndex,
    perms: Vec<umrs_policy::ids::PermIndex>,
) -> AvRule {
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
fn s1_no_relabel_permission_leaves_relabel_query_empty_but_rule_query_finds_it() {
    let mut b = PolicyDbBuilder::new();
    let domain_t = b.intern_type("domain_t");
    let file_t = b.intern_type("file_t");
    let file_class = b.intern_class("file", 1, None);
    let read = b.intern_perm("read");
    let write = b.intern_perm("write");
    b.add_av_rule(allow_rule(domain_t, file_t, file_class, vec![read, write]));
    let db = b.build();

    let sets = umrs_policy::build_relabel_sets(&db).unwrap();
    let results = umrs_policy::relabel_query(&sets, domain_t, Mode::To, None);
    assert!(results.is_empty());

    let filter = RuleFilter {
        type_filter: Some((domain_t, ListSelector::Source, IndirectMode::Direct)),
        ..Default::default()
    };
    let matches = umrs_policy::query_rules(&db, &filter).unwrap();
    assert_eq!(matches, vec![0]);
}

#[test]
fn s2_attribute_self_pair_produces_four_relabel_entries() {
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

    let sets = umrs_policy::build_relabel_sets(&db).unwrap();
    let total: usize = [t1, t2].iter().map(|&s| sets.subject(s).unwrap().len()).sum();
    assert_eq!(total, 4);
    for subject in [t1, t2] {
        for target in [t1, t2] {
            assert!(sets.subject(subject).unwrap()[&target].direction.has_to());
        }
    }
}

#[test]
fn s3_conditional_branch_selects_which_allow_contributes() {
    let mut b = PolicyDbBuilder::new();
    let s1 = b.intern_type("s1");
    let t1 = b.intern_type("t1");
    let t2 = b.intern_type("t2");
    let file_class = b.intern_class("file", 1, None);
    let relabelto = b.intern_perm("relabelto");
    let boolean = b.intern_boolean("b");

    let rule_true = b.add_av_rule(allow_rule(s1, t1, file_class, vec![relabelto]));
    let rule_false = b.add_av_rule(allow_rule(s1, t2, file_class, vec![relabelto]));
    b.add_conditional(ConditionalExpr {
        rpn_nodes: vec![CondNode::Bool(boolean)],
        true_rules: vec![GuardedRule::Av(rule_true)],
        false_rules: vec![GuardedRule::Av(rule_false)],
        current_value: None,
    });
    b.set_boolean_default(boolean, true).unwrap();
    let db_true = b.build();

    let sets_true = umrs_policy::build_relabel_sets(&db_true).unwrap();
    let entries_true = sets_true.subject(s1).unwrap();
    assert!(entries_true.contains_key(&t1));
    assert!(!entries_true.contains_key(&t2));

    // Flipping the default swaps which branch contributes.
    let mut b2 = PolicyDbBuilder::new();
    let s1 = b2.intern_type("s1");
    let t1 = b2.intern_type("t1");
    let t2 = b2.intern_type("t2");
    let file_class = b2.intern_class("file", 1, None);
    let relabelto = b2.intern_perm("relabelto");
    let boolean = b2.intern_boolean("b");
    let rule_true = b2.add_av_rule(allow_rule(s1, t1, file_class, vec![relabelto]));
    let rule_false = b2.add_av_rule(allow_rule(s1, t2, file_class, vec![relabelto]));
    b2.add_conditional(ConditionalExpr {
        rpn_nodes: vec![CondNode::Bool(boolean)],
        true_rules: vec![GuardedRule::Av(rule_true)],
        false_rules: vec![GuardedRule::Av(rule_false)],
        current_value: None,
    });
    b2.set_boolean_default(boolean, false).unwrap();
    let db_false = b2.build();

    let sets_false = umrs_policy::build_relabel_sets(&db_false).unwrap();
    let entries_false = sets_false.subject(s1).unwrap();
    assert!(!entries_false.contains_key(&t1));
    assert!(entries_false.contains_key(&t2));
}

#[test]
fn s4_clone_applies_to_allow_but_is_suppressed_for_process_type_transition() {
    let mut b = PolicyDbBuilder::new();
    let src_t = b.intern_type("src_t");
    let tgt_t = b.intern_type("tgt_t");
    let obj_t = b.intern_type("obj_t");
    let file_class = b.intern_class("file", 1, None);
    let process_class = b.intern_class("process", 1, None);
    let relabelto = b.intern_perm("relabelto");

    b.add_av_rule(allow_rule(src_t, obj_t, file_class, vec![relabelto]));
    let tt_rule = TypeRule {
        kind: TypeRuleKind::TypeTransition,
        flags: RuleFlags::NONE,
        source_line: 2,
        src_set: TypeList::literal_types([src_t]),
        tgt_set: TypeList::literal_types([obj_t]),
        class_set: RuleList::literal([process_class]),
        default_type: src_t,
    };
    let clone = CloneRule {
        src_type: src_t,
        tgt_type: tgt_t,
        source_line: 3,
    };
    b.add_type_rule(tt_rule.clone());
    b.add_clone_rule(clone);
    let db = b.build();

    assert!(umrs_policy::query::is_clone_suppressed_for_type_transition(
        &db, &clone, &tt_rule
    ));

    let sets = umrs_policy::build_relabel_sets(&db).unwrap();
    assert!(sets.subject(tgt_t).unwrap().contains_key(&obj_t));
    assert!(sets.subject(tgt_t).unwrap()[&obj_t].direction.has_to());
}

#[test]
fn s5_permission_map_loads_weight_and_reports_unmapped_default() {
    let text = "1\nclass file 1\nread r 7\n";
    let mut sink = MessageSink::stderr_fallback();
    let map = umrs_policy::load_permission_map(text, &["file"], &[], &mut sink).unwrap();

    let read = map.get("file", "read");
    assert_eq!(read.access, Access::Read);
    assert_eq!(read.weight, 7);

    let unmapped = map.get("file", "write");
    assert_eq!(unmapped.access, Access::Unmapped);

    let round_tripped = umrs_policy::save_permission_map(&map);
    assert!(round_tripped.contains("read r 7"));
}

#[test]
fn s6_demorgan_form_is_equivalent_not_inverse() {
    let a = umrs_policy::ids::BoolIndex::from(0);
    let bb = umrs_policy::ids::BoolIndex::from(1);

    let lhs = vec![CondNode::Bool(a), CondNode::Bool(bb), CondNode::And];
    let rhs = vec![
        CondNode::Bool(a),
        CondNode::Not,
        CondNode::Bool(bb),
        CondNode::Not,
        CondNode::Or,
        CondNode::Not,
    ];
    assert_eq!(
        umrs_policy::condeval::compare_equivalence(&lhs, &rhs),
        umrs_policy::condeval::Equivalence::Equal
    );

    let values = |idx: umrs_policy::ids::BoolIndex| -> Option<bool> {
        if idx == a {
            Some(true)
        } else if idx == bb {
            Some(false)
        } else {
            None
        }
    };
    assert_eq!(
        umrs_policy::evaluate_condition(&lhs, &values),
        umrs_policy::evaluate_condition(&rhs, &values)
    );
}

// ---------------------------------------------------------------------
// Universally-quantified properties (§8, properties 1-10)
// ---------------------------------------------------------------------

#[test]
fn property_1_symbol_table_round_trip() {
    let mut b = PolicyDbBuilder::new();
    for name in ["a_t", "b_t", "httpd_t"] {
        b.intern_type(name);
    }
    let db = b.build();
    for name in ["a_t", "b_t", "httpd_t"] {
        let idx = db.types.lookup_by_name(name).unwrap();
        assert_eq!(db.types.lookup_by_index(idx), Some(name));
    }
}

#[test]
fn property_2_alias_transparency() {
    let mut b = PolicyDbBuilder::new();
    let t = b.intern_type("httpd_t");
    b.add_type_alias(t, "httpd_sys_t").unwrap();
    let db = b.build();

    assert_eq!(db.types.lookup_by_name("httpd_sys_t"), db.types.lookup_by_name("httpd_t"));
}

#[test]
fn property_3_attribute_symmetry() {
    let mut b = PolicyDbBuilder::new();
    let t = b.intern_type("t1");
    let a = b.intern_attribute("a");
    b.add_type_to_attribute(t, a).unwrap();
    let db = b.build();

    assert!(db.attribute_decl(a).unwrap().type_set.contains(&t));
    assert!(db.type_decl(t).unwrap().attribute_set.contains(&a));
}

#[test]
fn property_4_expansion_is_idempotent() {
    let mut b = PolicyDbBuilder::new();
    let a = b.intern_attribute("a");
    let t1 = b.intern_type("t1");
    let t2 = b.intern_type("t2");
    b.add_type_to_attribute(t1, a).unwrap();
    b.add_type_to_attribute(t2, a).unwrap();
    let db = b.build();

    let mut list = TypeList::default();
    list.push_attr(a);

    let first = umrs_policy::query::expand_types(&db, &list, None);
    let second = umrs_policy::query::expand_types(&db, &list, None);
    assert_eq!(first.set, second.set);
    assert_eq!(first.status, second.status);
}

#[test]
fn property_5_wildcard_without_complement_reports_empty_set() {
    let db = PolicyDbBuilder::new().build();
    let list = TypeList::wildcard();
    let expansion = umrs_policy::query::expand_types(&db, &list, None);
    assert_eq!(expansion.status, umrs_policy::query::ExpandStatus::Wildcard);
    assert!(expansion.set.is_empty());
}

#[test]
fn property_6_self_target_includes_every_source_member() {
    let mut b = PolicyDbBuilder::new();
    let t1 = b.intern_type("t1");
    let t2 = b.intern_type("t2");
    let db = b.build();

    let mut source_set = std::collections::BTreeSet::new();
    source_set.insert(t1);
    source_set.insert(t2);

    let tgt_list = TypeList::self_only();
    let expansion = umrs_policy::query::expand_types(&db, &tgt_list, Some(&source_set));
    for s in &source_set {
        assert!(expansion.set.contains(s));
    }
}

#[test]
fn property_7_equivalent_expressions_evaluate_identically() {
    let a = umrs_policy::ids::BoolIndex::from(0);
    let bb = umrs_policy::ids::BoolIndex::from(1);
    let lhs = vec![CondNode::Bool(a), CondNode::Bool(bb), CondNode::Xor];
    let rhs = vec![
        CondNode::Bool(a),
        CondNode::Bool(bb),
        CondNode::Eq,
        CondNode::Not,
    ];
    assert_eq!(
        umrs_policy::condeval::compare_equivalence(&lhs, &rhs),
        umrs_policy::condeval::Equivalence::Equal
    );
    for (av, bv) in [(true, true), (true, false), (false, true), (false, false)] {
        let values = |idx: umrs_policy::ids::BoolIndex| -> Option<bool> {
            if idx == a {
                Some(av)
            } else if idx == bb {
                Some(bv)
            } else {
                None
            }
        };
        assert_eq!(
            umrs_policy::evaluate_condition(&lhs, &values),
            umrs_policy::evaluate_condition(&rhs, &values)
        );
    }
}

#[test]
fn property_8_relabel_soundness_every_entry_has_a_witness_rule() {
    let mut b = PolicyDbBuilder::new();
    let domain_t = b.intern_type("domain_t");
    let file_t = b.intern_type("file_t");
    let file_class = b.intern_class("file", 1, None);
    let relabelto = b.intern_perm("relabelto");
    b.add_av_rule(allow_rule(domain_t, file_t, file_class, vec![relabelto]));
    let db = b.build();

    let sets = umrs_policy::build_relabel_sets(&db).unwrap();
    let entry = &sets.subject(domain_t).unwrap()[&file_t];
    assert!(entry.direction.has_to());
    assert!(!entry.rule_indices().is_empty());
    for &rule_idx in &entry.rule_indices() {
        let rule = &db.av_rules[rule_idx as usize];
        assert_eq!(rule.kind, AvRuleKind::Allow);
    }
}

#[test]
fn property_9_relabel_completeness_every_relabelto_pair_is_recorded() {
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

    let sets = umrs_policy::build_relabel_sets(&db).unwrap();
    for src in [t1, t2] {
        for tgt in [t1, t2] {
            assert!(sets.subject(src).unwrap()[&tgt].direction.has_to());
        }
    }
}

#[test]
fn property_10_filter_monotonicity_never_adds_results() {
    let mut b = PolicyDbBuilder::new();
    let domain_t = b.intern_type("domain_t");
    let file_t = b.intern_type("file_t");
    let file_class = b.intern_class("file", 1, None);
    let relabelto = b.intern_perm("relabelto");
    let read = b.intern_perm("read");
    b.add_class_perm(file_class, relabelto).unwrap();
    b.add_class_perm(file_class, read).unwrap();
    b.add_av_rule(allow_rule(domain_t, file_t, file_class, vec![relabelto, read]));
    let db = b.build();

    let sets = umrs_policy::build_relabel_sets(&db).unwrap();

    let unfiltered = umrs_policy::relabel_query(&sets, domain_t, Mode::Domain, None);
    let mut filter = RelabelFilter::new();
    filter.allow_class(file_class, [read].into_iter().collect());
    let filtered = umrs_policy::relabel_query(&sets, domain_t, Mode::Domain, Some(&filter));
    assert!(filtered.len() <= unfiltered.len());

    let mut impossible_filter = RelabelFilter::new();
    let unknown_perm = umrs_policy::ids::PermIndex::from(9999);
    impossible_filter.allow_class(file_class, [unknown_perm].into_iter().collect());
    let narrowed = umrs_policy::relabel_query(&sets, domain_t, Mode::Domain, Some(&impossible_filter));
    assert!(narrowed.len() <= filtered.len());
}
