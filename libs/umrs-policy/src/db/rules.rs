// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Rule shapes (§3): AV rules, type-transition family, role rules,
//! range-transitions, and clone rules.
//!
//! A rule's source/target/class/perm lists are never plain `Vec<Idx>` —
//! each entry may be a literal, a complement (`~`), and the list as a whole
//! may carry the wildcard (`*`) flag (§9: "wildcards are promoted to a flag
//! on the rule to preserve O(1) wildcard checks", rather than modeled as a
//! linked list of type-or-attribute records).
// ===========================================================================

use crate::ids::{AttrIndex, ClassIndex, PermIndex, RoleIndex, TypeIndex};

/// One entry in a rule's source/target/class/perm list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetEntry<Idx> {
    Literal(Idx),
    Complement(Idx),
}

impl<Idx: Copy> SetEntry<Idx> {
    #[must_use]
    pub const fn index(self) -> Idx {
        match self {
            Self::Literal(i) | Self::Complement(i) => i,
        }
    }

    #[must_use]
    pub const fn is_complement(self) -> bool {
        matches!(self, Self::Complement(_))
    }
}

/// A polymorphic rule-list: a set of literal/complement entries plus a
/// wildcard flag. `self_allowed` additionally records whether the `self`
/// pseudo-type is present — legal only in an AV rule's target list (§3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleList<Idx> {
    pub entries: Vec<SetEntry<Idx>>,
    pub wildcard: bool,
    pub has_self: bool,
}

impl<Idx: Copy + PartialEq> RuleList<Idx> {
    #[must_use]
    pub fn literal(entries: impl IntoIterator<Item = Idx>) -> Self {
        Self {
            entries: entries.into_iter().map(SetEntry::Literal).collect(),
            wildcard: false,
            has_self: false,
        }
    }

    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            entries: Vec::new(),
            wildcard: true,
            has_self: false,
        }
    }

    pub fn push_literal(&mut self, idx: Idx) {
        self.entries.push(SetEntry::Literal(idx));
    }

    pub fn push_complement(&mut self, idx: Idx) {
        self.entries.push(SetEntry::Complement(idx));
    }

    #[must_use]
    pub fn complements(&self) -> impl Iterator<Item = Idx> + '_ {
        self.entries.iter().filter_map(|e| match e {
            SetEntry::Complement(i) => Some(*i),
            SetEntry::Literal(_) => None,
        })
    }

    #[must_use]
    pub fn literals(&self) -> impl Iterator<Item = Idx> + '_ {
        self.entries.iter().filter_map(|e| match e {
            SetEntry::Literal(i) => Some(*i),
            SetEntry::Complement(_) => None,
        })
    }
}

/// One entry in a type-position list (a rule's `src_set`/`tgt_set`),
/// which — unlike class/perm/role lists — may name either a type or an
/// attribute, each possibly complemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeListEntry {
    Type(TypeIndex),
    ComplementType(TypeIndex),
    Attr(AttrIndex),
    ComplementAttr(AttrIndex),
}

impl TypeListEntry {
    #[must_use]
    pub const fn is_complement(self) -> bool {
        matches!(self, Self::ComplementType(_) | Self::ComplementAttr(_))
    }
}

/// A rule's type-position list: a mixture of type and attribute literals
/// (each possibly complemented), a wildcard flag, and whether the `self`
/// pseudo-type is present (legal only in an AV rule's target list, §3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeList {
    pub entries: Vec<TypeListEntry>,
    pub wildcard: bool,
    pub has_self: bool,
}

impl TypeList {
    #[must_use]
    pub fn literal_types(entries: impl IntoIterator<Item = TypeIndex>) -> Self {
        Self {
            entries: entries.into_iter().map(TypeListEntry::Type).collect(),
            wildcard: false,
            has_self: false,
        }
    }

    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            entries: Vec::new(),
            wildcard: true,
            has_self: false,
        }
    }

    #[must_use]
    pub fn self_only() -> Self {
        Self {
            entries: Vec::new(),
            wildcard: false,
            has_self: true,
        }
    }

    pub fn push_type(&mut self, idx: TypeIndex) {
        self.entries.push(TypeListEntry::Type(idx));
    }

    pub fn push_attr(&mut self, idx: AttrIndex) {
        self.entries.push(TypeListEntry::Attr(idx));
    }

    pub fn push_complement_type(&mut self, idx: TypeIndex) {
        self.entries.push(TypeListEntry::ComplementType(idx));
    }

    pub fn push_complement_attr(&mut self, idx: AttrIndex) {
        self.entries.push(TypeListEntry::ComplementAttr(idx));
    }

    pub fn set_self(&mut self) {
        self.has_self = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvRuleKind {
    Allow,
    Neverallow,
    Auditallow,
    Dontaudit,
    Auditdeny,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RuleFlags: u8 {
        const NONE = 0;
    }
}

/// An AV rule's source/target list (§3: "each *set* is a list of entries
/// of one of four shapes"). Source lists never carry `self`; it is only
/// legal in the target list of an AV rule.
#[derive(Debug, Clone)]
pub struct AvRule {
    pub kind: AvRuleKind,
    pub flags: RuleFlags,
    pub source_line: u32,
    pub src_set: TypeList,
    pub tgt_set: TypeList,
    pub class_set: RuleList<ClassIndex>,
    pub perm_set: RuleList<PermIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRuleKind {
    TypeTransition,
    TypeChange,
    TypeMember,
}

#[derive(Debug, Clone)]
pub struct TypeRule {
    pub kind: TypeRuleKind,
    pub flags: RuleFlags,
    pub source_line: u32,
    pub src_set: TypeList,
    pub tgt_set: TypeList,
    pub class_set: RuleList<ClassIndex>,
    pub default_type: TypeIndex,
}

#[derive(Debug, Clone)]
pub struct RoleAllowRule {
    pub src_roles: RuleList<RoleIndex>,
    pub tgt_roles: RuleList<RoleIndex>,
    pub source_line: u32,
}

#[derive(Debug, Clone)]
pub struct RoleTransitionRule {
    pub src_roles: RuleList<RoleIndex>,
    pub tgt_types: TypeList,
    pub new_role: RoleIndex,
    pub source_line: u32,
}

#[derive(Debug, Clone)]
pub struct RangeTransitionRule {
    pub src_types: TypeList,
    pub tgt_types: TypeList,
    pub new_range: umrs_selinux::MlsRange,
    pub source_line: u32,
}

/// A directive to treat `tgt_type` as inheriting every rule of `src_type`,
/// resolved dynamically at query time rather than pre-expanded into
/// synthetic rules (§9).
#[derive(Debug, Clone, Copy)]
pub struct CloneRule {
    pub src_type: TypeIndex,
    pub tgt_type: TypeIndex,
    pub source_line: u32,
}
