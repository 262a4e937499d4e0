// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! JSON adapter for "an already-expanded policy database produced by an
//! external expander" (spec.md §1). `umrs-policy`'s core never parses a
//! source policy language or a binary kernel image itself — that is an
//! external loader's job, and this module is that loader for the CLI: it
//! deserializes a declaration-and-rule document into calls against
//! [`umrs_policy::PolicyDbBuilder`], resolving every name to an index as
//! it is encountered and downgrading an unresolved reference to a warning
//! (via the caller's [`umrs_policy::MessageSink`]) rather than aborting
//! the whole load, matching the adapter-vs-core distinction in §7
//! ("Unknown identifier ... On load: reported as a warning, the enclosing
//! declaration is skipped").
// ===========================================================================

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use umrs_policy::db::{
    AvRule, AvRuleKind, CloneRule, CondNode, ConditionalExpr, GuardedRule, PolicyDbBuilder,
    RangeTransitionRule, RoleAllowRule, RoleTransitionRule, RuleFlags, RuleList, TypeList,
    TypeListEntry, TypeRule, TypeRuleKind,
};
use umrs_policy::error::{MessageSink, Severity};
use umrs_policy::ids::{BoolIndex, ClassIndex, PermIndex, RoleIndex, TypeIndex};
use umrs_policy::PolicyDb;

#[derive(Debug, Deserialize, Default)]
pub struct PolicyDoc {
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeDoc>,
    #[serde(default)]
    pub roles: Vec<RoleDoc>,
    #[serde(default)]
    pub users: Vec<UserDoc>,
    #[serde(default)]
    pub common_perms: Vec<CommonPermDoc>,
    #[serde(default)]
    pub classes: Vec<ClassDoc>,
    #[serde(default)]
    pub booleans: Vec<String>,
    /// Declared default truth value per boolean (§4.E); a name in
    /// `booleans` absent here defaults to `false`, matching
    /// `PolicyDbBuilder::intern_boolean`'s own default.
    #[serde(default)]
    pub bool_defaults: HashMap<String, bool>,
    #[serde(default)]
    pub av_rules: Vec<AvRuleDoc>,
    #[serde(default)]
    pub type_rules: Vec<TypeRuleDoc>,
    #[serde(default)]
    pub role_allows: Vec<RoleAllowDoc>,
    #[serde(default)]
    pub role_transitions: Vec<RoleTransitionDoc>,
    #[serde(default)]
    pub range_transitions: Vec<RangeTransitionDoc>,
    #[serde(default)]
    pub clone_rules: Vec<CloneRuleDoc>,
    #[serde(default)]
    pub conditionals: Vec<ConditionalDoc>,
    #[serde(default)]
    pub validatetrans: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct TypeDoc {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RoleDoc {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub dominates: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UserDoc {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub mls_range: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CommonPermDoc {
    pub name: String,
    #[serde(default)]
    pub perms: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClassDoc {
    pub name: String,
    pub value: u32,
    #[serde(default)]
    pub common: Option<String>,
    #[serde(default)]
    pub perms: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TypeListDoc {
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default)]
    pub has_self: bool,
    #[serde(default)]
    pub entries: Vec<TypeListEntryDoc>,
}

#[derive(Debug, Deserialize)]
pub enum TypeListEntryDoc {
    #[serde(rename = "type")]
    Type(String),
    #[serde(rename = "complement_type")]
    ComplementType(String),
    #[serde(rename = "attr")]
    Attr(String),
    #[serde(rename = "complement_attr")]
    ComplementAttr(String),
}

#[derive(Debug, Deserialize, Default)]
pub struct NameListDoc {
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default)]
    pub entries: Vec<NameListEntryDoc>,
}

#[derive(Debug, Deserialize)]
pub enum NameListEntryDoc {
    #[serde(rename = "lit")]
    Literal(String),
    #[serde(rename = "not")]
    Complement(String),
}

#[derive(Debug, Deserialize)]
pub struct AvRuleDoc {
    pub kind: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub src: TypeListDoc,
    #[serde(default)]
    pub tgt: TypeListDoc,
    #[serde(default)]
    pub classes: NameListDoc,
    #[serde(default)]
    pub perms: NameListDoc,
}

#[derive(Debug, Deserialize)]
pub struct TypeRuleDoc {
    pub kind: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub src: TypeListDoc,
    #[serde(default)]
    pub tgt: TypeListDoc,
    #[serde(default)]
    pub classes: NameListDoc,
    pub default: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleAllowDoc {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub src: NameListDoc,
    #[serde(default)]
    pub tgt: NameListDoc,
}

#[derive(Debug, Deserialize)]
pub struct RoleTransitionDoc {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub src: NameListDoc,
    #[serde(default)]
    pub tgt_types: TypeListDoc,
    pub new_role: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeTransitionDoc {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub src_types: TypeListDoc,
    #[serde(default)]
    pub tgt_types: TypeListDoc,
    pub new_range: String,
}

#[derive(Debug, Deserialize)]
pub struct CloneRuleDoc {
    #[serde(default)]
    pub line: u32,
    pub src: String,
    pub tgt: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConditionalDoc {
    /// RPN tokens: a boolean name, or one of `!`, `||`, `&&`, `^`, `==`, `!=`.
    pub rpn: Vec<String>,
    #[serde(default)]
    pub true_av_rules: Vec<u32>,
    #[serde(default)]
    pub false_av_rules: Vec<u32>,
}

/// Resolution context tracking name -> index maps as declarations stream
/// in, and forwarding unresolved references as warnings (§7) rather than
/// failing the whole load.
struct Resolver<'a> {
    builder: PolicyDbBuilder,
    sink: &'a mut MessageSink,
    types: HashMap<String, TypeIndex>,
    attrs: HashMap<String, umrs_policy::ids::AttrIndex>,
    roles: HashMap<String, RoleIndex>,
    classes: HashMap<String, ClassIndex>,
    perms: HashMap<String, PermIndex>,
    booleans: HashMap<String, BoolIndex>,
}

impl<'a> Resolver<'a> {
    fn warn_unknown(&mut self, kind: &str, name: &str) {
        self.sink.emit(
            Severity::Warning,
            &format!("unknown {kind} '{name}' referenced; enclosing declaration skipped"),
        );
    }

    fn resolve_type(&mut self, name: &str) -> Option<TypeIndex> {
        self.types.get(name).copied().or_else(|| {
            self.warn_unknown("type", name);
            None
        })
    }

    fn resolve_attr(&mut self, name: &str) -> Option<umrs_policy::ids::AttrIndex> {
        self.attrs.get(name).copied().or_else(|| {
            self.warn_unknown("attribute", name);
            None
        })
    }

    fn resolve_role(&mut self, name: &str) -> Option<RoleIndex> {
        self.roles.get(name).copied().or_else(|| {
            self.warn_unknown("role", name);
            None
        })
    }

    fn resolve_class(&mut self, name: &str) -> Option<ClassIndex> {
        self.classes.get(name).copied().or_else(|| {
            self.warn_unknown("class", name);
            None
        })
    }

    fn resolve_perm(&mut self, name: &str) -> PermIndex {
        // Permissions are interned on first reference rather than
        // pre-declared, matching how a class's `unique_perms`/common
        // perm's `perms` already intern perms during pass 1.
        if let Some(&idx) = self.perms.get(name) {
            return idx;
        }
        let idx = self.builder.intern_perm(name);
        self.perms.insert(name.to_string(), idx);
        idx
    }

    fn resolve_bool(&mut self, name: &str) -> Option<BoolIndex> {
        self.booleans.get(name).copied().or_else(|| {
            self.warn_unknown("boolean", name);
            None
        })
    }

    fn build_type_list(&mut self, doc: &TypeListDoc) -> TypeList {
        let mut list = TypeList {
            wildcard: doc.wildcard,
            has_self: doc.has_self,
            entries: Vec::new(),
        };
        for entry in &doc.entries {
            match entry {
                TypeListEntryDoc::Type(name) => {
                    if let Some(idx) = self.resolve_type(name) {
                        list.entries.push(TypeListEntry::Type(idx));
                    }
                }
                TypeListEntryDoc::ComplementType(name) => {
                    if let Some(idx) = self.resolve_type(name) {
                        list.entries.push(TypeListEntry::ComplementType(idx));
                    }
                }
                TypeListEntryDoc::Attr(name) => {
                    if let Some(idx) = self.resolve_attr(name) {
                        list.entries.push(TypeListEntry::Attr(idx));
                    }
                }
                TypeListEntryDoc::ComplementAttr(name) => {
                    if let Some(idx) = self.resolve_attr(name) {
                        list.entries.push(TypeListEntry::ComplementAttr(idx));
                    }
                }
            }
        }
        list
    }

    fn build_class_list(&mut self, doc: &NameListDoc) -> RuleList<ClassIndex> {
        let mut list = RuleList {
            wildcard: doc.wildcard,
            entries: Vec::new(),
            has_self: false,
        };
        for entry in &doc.entries {
            match entry {
                NameListEntryDoc::Literal(name) => {
                    if let Some(idx) = self.resolve_class(name) {
                        list.push_literal(idx);
                    }
                }
                NameListEntryDoc::Complement(name) => {
                    if let Some(idx) = self.resolve_class(name) {
                        list.push_complement(idx);
                    }
                }
            }
        }
        list
    }

    fn build_perm_list(&mut self, doc: &NameListDoc) -> RuleList<PermIndex> {
        let mut list = RuleList {
            wildcard: doc.wildcard,
            entries: Vec::new(),
            has_self: false,
        };
        for entry in &doc.entries {
            match entry {
                NameListEntryDoc::Literal(name) => {
                    let idx = self.resolve_perm(name);
                    list.push_literal(idx);
                }
                NameListEntryDoc::Complement(name) => {
                    let idx = self.resolve_perm(name);
                    list.push_complement(idx);
                }
            }
        }
        list
    }

    fn build_role_list(&mut self, doc: &NameListDoc) -> RuleList<RoleIndex> {
        let mut list = RuleList {
            wildcard: doc.wildcard,
            entries: Vec::new(),
            has_self: false,
        };
        for entry in &doc.entries {
            match entry {
                NameListEntryDoc::Literal(name) => {
                    if let Some(idx) = self.resolve_role(name) {
                        list.push_literal(idx);
                    }
                }
                NameListEntryDoc::Complement(name) => {
                    if let Some(idx) = self.resolve_role(name) {
                        list.push_complement(idx);
                    }
                }
            }
        }
        list
    }
}

fn av_rule_kind(s: &str) -> Result<AvRuleKind> {
    Ok(match s {
        "allow" => AvRuleKind::Allow,
        "neverallow" => AvRuleKind::Neverallow,
        "auditallow" => AvRuleKind::Auditallow,
        "dontaudit" => AvRuleKind::Dontaudit,
        "auditdeny" => AvRuleKind::Auditdeny,
        other => bail!("unknown AV rule kind '{other}'"),
    })
}

fn type_rule_kind(s: &str) -> Result<TypeRuleKind> {
    Ok(match s {
        "type_transition" => TypeRuleKind::TypeTransition,
        "type_change" => TypeRuleKind::TypeChange,
        "type_member" => TypeRuleKind::TypeMember,
        other => bail!("unknown type-rule kind '{other}'"),
    })
}

fn cond_node(token: &str, resolver: &mut Resolver<'_>) -> Option<CondNode> {
    match token {
        "!" => Some(CondNode::Not),
        "||" => Some(CondNode::Or),
        "&&" => Some(CondNode::And),
        "^" => Some(CondNode::Xor),
        "==" => Some(CondNode::Eq),
        "!=" => Some(CondNode::Neq),
        name => resolver.resolve_bool(name).map(CondNode::Bool),
    }
}

/// Builds a [`PolicyDb`] from a [`PolicyDoc`], routing unresolved name
/// references to `sink` as warnings and skipping only the declaration
/// that referenced them (§7) rather than failing the whole document.
/// Malformed enum tags (an unrecognized rule kind) are a fatal
/// `Malformed`-bucket failure, since those are a grammar violation, not a
/// missing identifier.
pub fn load(doc: &PolicyDoc, sink: &mut MessageSink) -> Result<PolicyDb> {
    let mut resolver = Resolver {
        builder: PolicyDbBuilder::new(),
        sink,
        types: HashMap::new(),
        attrs: HashMap::new(),
        roles: HashMap::new(),
        classes: HashMap::new(),
        perms: HashMap::new(),
        booleans: HashMap::new(),
    };

    // Pass 1: classes/permissions/types/booleans (§4.B).
    for name in &doc.attributes {
        let idx = resolver.builder.intern_attribute(name);
        resolver.attrs.insert(name.clone(), idx);
    }
    for t in &doc.types {
        let idx = resolver.builder.intern_type(&t.name);
        resolver.types.insert(t.name.clone(), idx);
    }
    for t in &doc.types {
        let Some(&type_idx) = resolver.types.get(&t.name) else {
            continue;
        };
        for alias in &t.aliases {
            resolver
                .builder
                .add_type_alias(type_idx, alias)
                .with_context(|| format!("adding alias '{alias}' to type '{}'", t.name))?;
        }
        for attr_name in &t.attributes {
            if let Some(attr_idx) = resolver.resolve_attr(attr_name) {
                resolver.builder.add_type_to_attribute(type_idx, attr_idx)?;
            }
        }
    }
    for r in &doc.roles {
        let idx = resolver.builder.intern_role(&r.name);
        resolver.roles.insert(r.name.clone(), idx);
    }
    for common in &doc.common_perms {
        let common_idx = resolver.builder.intern_common_perm(&common.name);
        for perm_name in &common.perms {
            let perm_idx = resolver.resolve_perm(perm_name);
            resolver.builder.add_common_perm_member(common_idx, perm_idx)?;
        }
    }
    for class in &doc.classes {
        let common_idx = match &class.common {
            Some(name) => {
                let idx = resolver.builder.intern_common_perm(name);
                Some(idx)
            }
            None => None,
        };
        let class_idx = resolver.builder.intern_class(&class.name, class.value, common_idx);
        resolver.classes.insert(class.name.clone(), class_idx);
        for perm_name in &class.perms {
            let perm_idx = resolver.resolve_perm(perm_name);
            resolver.builder.add_class_perm(class_idx, perm_idx)?;
        }
    }
    for name in &doc.booleans {
        let idx = resolver.builder.intern_boolean(name);
        resolver.booleans.insert(name.clone(), idx);
        if let Some(&default) = doc.bool_defaults.get(name) {
            resolver.builder.set_boolean_default(idx, default)?;
        }
    }

    // Pass 2: declarations and rules that reference pass-1 entities.
    for r in &doc.roles {
        let Some(&role_idx) = resolver.roles.get(&r.name) else {
            continue;
        };
        for type_name in &r.types {
            if let Some(type_idx) = resolver.resolve_type(type_name) {
                resolver.builder.add_type_to_role(role_idx, type_idx)?;
            }
        }
        for dominated_name in &r.dominates {
            if let Some(dominated_idx) = resolver.resolve_role(dominated_name) {
                resolver.builder.add_dominated_role(role_idx, dominated_idx)?;
            }
        }
    }
    for u in &doc.users {
        let user_idx = resolver.builder.intern_user(&u.name);
        for role_name in &u.roles {
            if let Some(role_idx) = resolver.resolve_role(role_name) {
                resolver.builder.add_role_to_user(user_idx, role_idx)?;
            }
        }
        if let Some(range_str) = &u.mls_range {
            let range = umrs_selinux::MlsRange::from_str(range_str)
                .with_context(|| format!("parsing MLS range '{range_str}' for user '{}'", u.name))?;
            resolver
                .builder
                .set_user_mls(user_idx, Some(range.low().clone()), Some(range))?;
        }
    }
    resolver.builder.set_validatetrans_present(doc.validatetrans);

    for rule in &doc.av_rules {
        let kind = av_rule_kind(&rule.kind)?;
        let src_set = resolver.build_type_list(&rule.src);
        let tgt_set = resolver.build_type_list(&rule.tgt);
        let class_set = resolver.build_class_list(&rule.classes);
        let perm_set = resolver.build_perm_list(&rule.perms);
        resolver.builder.add_av_rule(AvRule {
            kind,
            flags: RuleFlags::NONE,
            source_line: rule.line,
            src_set,
            tgt_set,
            class_set,
            perm_set,
        });
    }

    for rule in &doc.type_rules {
        let kind = type_rule_kind(&rule.kind)?;
        let src_set = resolver.build_type_list(&rule.src);
        let tgt_set = resolver.build_type_list(&rule.tgt);
        let class_set = resolver.build_class_list(&rule.classes);
        let Some(default_type) = resolver.resolve_type(&rule.default) else {
            continue;
        };
        resolver.builder.add_type_rule(TypeRule {
            kind,
            flags: RuleFlags::NONE,
            source_line: rule.line,
            src_set,
            tgt_set,
            class_set,
            default_type,
        });
    }

    for rule in &doc.role_allows {
        let src_roles = resolver.build_role_list(&rule.src);
        let tgt_roles = resolver.build_role_list(&rule.tgt);
        resolver.builder.add_role_allow(RoleAllowRule {
            src_roles,
            tgt_roles,
            source_line: rule.line,
        });
    }

    for rule in &doc.role_transitions {
        let src_roles = resolver.build_role_list(&rule.src);
        let tgt_types = resolver.build_type_list(&rule.tgt_types);
        let Some(new_role) = resolver.resolve_role(&rule.new_role) else {
            continue;
        };
        resolver.builder.add_role_transition(RoleTransitionRule {
            src_roles,
            tgt_types,
            new_role,
            source_line: rule.line,
        });
    }

    for rule in &doc.range_transitions {
        let src_types = resolver.build_type_list(&rule.src_types);
        let tgt_types = resolver.build_type_list(&rule.tgt_types);
        let new_range = umrs_selinux::MlsRange::from_str(&rule.new_range)
            .with_context(|| format!("parsing MLS range '{}'", rule.new_range))?;
        resolver.builder.add_range_transition(RangeTransitionRule {
            src_types,
            tgt_types,
            new_range,
            source_line: rule.line,
        });
    }

    for rule in &doc.clone_rules {
        let (Some(src_type), Some(tgt_type)) =
            (resolver.resolve_type(&rule.src), resolver.resolve_type(&rule.tgt))
        else {
            continue;
        };
        resolver.builder.add_clone_rule(CloneRule {
            src_type,
            tgt_type,
            source_line: rule.line,
        });
    }

    for cond in &doc.conditionals {
        let mut rpn_nodes = Vec::with_capacity(cond.rpn.len());
        for token in &cond.rpn {
            match cond_node(token, &mut resolver) {
                Some(node) => rpn_nodes.push(node),
                None => continue,
            }
        }
        resolver.builder.add_conditional(ConditionalExpr {
            rpn_nodes,
            true_rules: cond.true_av_rules.iter().copied().map(GuardedRule::Av).collect(),
            false_rules: cond.false_av_rules.iter().copied().map(GuardedRule::Av).collect(),
            current_value: None,
        });
    }

    Ok(resolver.builder.build())
}
