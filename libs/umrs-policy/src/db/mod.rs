// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! The policy database (component B): typed arrays of declarations and
//! rules, built append-only and then frozen for the lifetime of any
//! derived index (query iterators, relabel sets). See §3 and §4.B.
//!
//! Construction is conceptually a two-pass parse performed by an external
//! loader: pass 1 populates classes, permissions, types, and booleans;
//! pass 2 populates rules that reference pass-1 entities. `PolicyDb` itself
//! does not enforce this ordering beyond "references must resolve before
//! you ask a query to run" — [`PolicyDbBuilder`] accepts declarations and
//! rules in any order and resolves names to indices as they arrive.
// ===========================================================================

pub mod classes;
pub mod cond;
pub mod ocontext;
pub mod roles;
pub mod rules;
pub mod types;
pub mod users;
pub mod version;

use std::collections::BTreeSet;

use crate::error::{PolicyError, PolicyResult};
use crate::ids::{
    AttrIndex, BoolIndex, ClassIndex, CommonPermIndex, PermIndex, RoleIndex, TypeIndex, UserIndex,
};
use crate::symtab::SymbolTable;

pub use classes::{CommonPermission, ObjectClass};
pub use cond::{CondNode, ConditionalExpr, GuardedRule};
pub use ocontext::{AddressFamily, FsUseBehavior, InitialSid, Ocontext};
pub use roles::RoleDecl;
pub use rules::{
    AvRule, AvRuleKind, CloneRule, RangeTransitionRule, RoleAllowRule, RoleTransitionRule,
    RuleFlags, RuleList, SetEntry, TypeList, TypeListEntry, TypeRule, TypeRuleKind,
};
pub use types::{AttributeDecl, TypeDecl};
pub use users::UserDecl;
pub use version::PolicyVersion;

/// The in-memory policy database. Single-writer during load (via
/// [`PolicyDbBuilder`]), read-only thereafter (§5).
#[derive(Debug, Clone)]
pub struct PolicyDb {
    pub types: SymbolTable<TypeIndex>,
    pub attributes: SymbolTable<AttrIndex>,
    pub roles: SymbolTable<RoleIndex>,
    pub users: SymbolTable<UserIndex>,
    pub classes: SymbolTable<ClassIndex>,
    pub perms: SymbolTable<PermIndex>,
    pub common_perms: SymbolTable<CommonPermIndex>,
    pub booleans: SymbolTable<BoolIndex>,

    pub type_decls: Vec<TypeDecl>,
    pub attribute_decls: Vec<AttributeDecl>,
    pub role_decls: Vec<RoleDecl>,
    pub user_decls: Vec<UserDecl>,
    pub class_decls: Vec<ObjectClass>,
    pub common_perm_decls: Vec<CommonPermission>,

    pub av_rules: Vec<AvRule>,
    pub type_rules: Vec<TypeRule>,
    pub role_allows: Vec<RoleAllowRule>,
    pub role_transitions: Vec<RoleTransitionRule>,
    pub range_transitions: Vec<RangeTransitionRule>,
    pub clone_rules: Vec<CloneRule>,
    pub conditionals: Vec<ConditionalExpr>,

    pub ocontexts: Vec<Ocontext>,
    pub initial_sids: Vec<InitialSid>,

    /// Declared default truth value per boolean, parallel to `booleans`.
    pub bool_decls: Vec<bool>,
    /// AV/type-transition-family rule indices whose governing conditional
    /// resolved to the *other* branch (or to `Undefined`) during
    /// [`PolicyDbBuilder::build`] — component E's contribution to B (§2:
    /// "E is consulted when B contains conditional rules to decide which
    /// branch's rules are active"). Consulted by the relabel-set builder
    /// and `query_rules` so an inactive branch's rules contribute nothing.
    pub inactive_av_rules: BTreeSet<u32>,
    pub inactive_type_rules: BTreeSet<u32>,

    pub mls_enabled: bool,
    pub has_validatetrans: bool,
}

impl PolicyDb {
    #[must_use]
    pub fn new() -> Self {
        Self {
            // Index 0 is reserved for the `self` pseudo-type (§3, §9); the
            // type table is the only one that starts interning at 1.
            types: SymbolTable::starting_at(1),
            attributes: SymbolTable::new(),
            roles: SymbolTable::new(),
            users: SymbolTable::new(),
            classes: SymbolTable::new(),
            perms: SymbolTable::new(),
            common_perms: SymbolTable::new(),
            booleans: SymbolTable::new(),

            type_decls: Vec::new(),
            attribute_decls: Vec::new(),
            role_decls: Vec::new(),
            user_decls: Vec::new(),
            class_decls: Vec::new(),
            common_perm_decls: Vec::new(),

            av_rules: Vec::new(),
            type_rules: Vec::new(),
            role_allows: Vec::new(),
            role_transitions: Vec::new(),
            range_transitions: Vec::new(),
            clone_rules: Vec::new(),
            conditionals: Vec::new(),

            ocontexts: Vec::new(),
            initial_sids: Vec::new(),

            bool_decls: Vec::new(),
            inactive_av_rules: BTreeSet::new(),
            inactive_type_rules: BTreeSet::new(),

            mls_enabled: false,
            has_validatetrans: false,
        }
    }

    /// Whether AV rule `idx` is active given the resolved state of its
    /// governing conditional, if any (§4.E). Unconditional rules are
    /// always active.
    #[must_use]
    pub fn is_av_rule_active(&self, idx: u32) -> bool {
        !self.inactive_av_rules.contains(&idx)
    }

    /// As [`PolicyDb::is_av_rule_active`], for the type-transition family.
    #[must_use]
    pub fn is_type_rule_active(&self, idx: u32) -> bool {
        !self.inactive_type_rules.contains(&idx)
    }

    #[must_use]
    pub fn version(&self) -> PolicyVersion {
        version::infer_version(self)
    }

    fn decl_index(vec_len: usize, idx: u32) -> Option<usize> {
        let idx = idx as usize;
        if idx < vec_len {
            Some(idx)
        } else {
            None
        }
    }

    #[must_use]
    pub fn type_decl(&self, idx: TypeIndex) -> Option<&TypeDecl> {
        // Type indices start at 1 (0 is `self`); declaration storage is
        // still 0-based, so offset by the type table's reserved slot.
        Self::decl_index(self.type_decls.len(), idx.value().checked_sub(1)?)
            .map(|i| &self.type_decls[i])
    }

    #[must_use]
    pub fn attribute_decl(&self, idx: AttrIndex) -> Option<&AttributeDecl> {
        Self::decl_index(self.attribute_decls.len(), idx.value())
            .map(|i| &self.attribute_decls[i])
    }

    #[must_use]
    pub fn class_decl(&self, idx: ClassIndex) -> Option<&ObjectClass> {
        Self::decl_index(self.class_decls.len(), idx.value()).map(|i| &self.class_decls[i])
    }

    #[must_use]
    pub fn common_perm_decl(&self, idx: CommonPermIndex) -> Option<&CommonPermission> {
        Self::decl_index(self.common_perm_decls.len(), idx.value())
            .map(|i| &self.common_perm_decls[i])
    }

    #[must_use]
    pub fn role_decl(&self, idx: RoleIndex) -> Option<&RoleDecl> {
        Self::decl_index(self.role_decls.len(), idx.value()).map(|i| &self.role_decls[i])
    }
}

impl Default for PolicyDb {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder accepting declarations and rules in any order, resolving names
/// to indices as they arrive (§4.B: "any order is fine as long as
/// references are resolved before finalization").
#[derive(Debug, Default)]
pub struct PolicyDbBuilder {
    db: PolicyDb,
}

impl PolicyDbBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { db: PolicyDb::new() }
    }

    /// Interns a type declaration, creating it if absent.
    pub fn intern_type(&mut self, name: &str) -> TypeIndex {
        let (idx, was_new) = self.db.types.intern(name);
        if was_new {
            self.db.type_decls.push(TypeDecl {
                name: name.to_string(),
                ..Default::default()
            });
        }
        idx
    }

    pub fn add_type_alias(&mut self, type_index: TypeIndex, alias: &str) -> PolicyResult<()> {
        self.db
            .types
            .intern_alias(type_index, alias)
            .map_err(|e| PolicyError::InvalidArgument(e.to_string()))?;
        if let Some(decl) = self.type_index_to_decl_mut(type_index) {
            decl.aliases.push(alias.to_string());
        }
        Ok(())
    }

    fn type_index_to_decl_mut(&mut self, idx: TypeIndex) -> Option<&mut TypeDecl> {
        let i = idx.value().checked_sub(1)? as usize;
        self.db.type_decls.get_mut(i)
    }

    pub fn intern_attribute(&mut self, name: &str) -> AttrIndex {
        let (idx, was_new) = self.db.attributes.intern(name);
        if was_new {
            self.db.attribute_decls.push(AttributeDecl {
                name: name.to_string(),
                ..Default::default()
            });
        }
        idx
    }

    /// Materializes both directions of the type<->attribute relation
    /// (§3 invariant, §9 design note): the type's `attribute_set` is
    /// authoritative and the attribute's `type_set` is kept in lock-step.
    pub fn add_type_to_attribute(
        &mut self,
        type_index: TypeIndex,
        attr_index: AttrIndex,
    ) -> PolicyResult<()> {
        let type_decl = self
            .type_index_to_decl_mut(type_index)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such type {type_index}")))?;
        type_decl.attribute_set.insert(attr_index);

        let attr_i = attr_index.value() as usize;
        let attr_decl = self
            .db
            .attribute_decls
            .get_mut(attr_i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such attribute {attr_index}")))?;
        attr_decl.type_set.insert(type_index);
        Ok(())
    }

    pub fn intern_role(&mut self, name: &str) -> RoleIndex {
        let (idx, was_new) = self.db.roles.intern(name);
        if was_new {
            self.db.role_decls.push(RoleDecl {
                name: name.to_string(),
                ..Default::default()
            });
        }
        idx
    }

    pub fn add_type_to_role(&mut self, role_index: RoleIndex, type_index: TypeIndex) -> PolicyResult<()> {
        let i = role_index.value() as usize;
        let decl = self
            .db
            .role_decls
            .get_mut(i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such role {role_index}")))?;
        decl.type_set.insert(type_index);
        Ok(())
    }

    pub fn add_dominated_role(&mut self, role_index: RoleIndex, dominated: RoleIndex) -> PolicyResult<()> {
        let i = role_index.value() as usize;
        let decl = self
            .db
            .role_decls
            .get_mut(i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such role {role_index}")))?;
        decl.dominated_roles.insert(dominated);
        Ok(())
    }

    pub fn add_role_to_user(&mut self, user_index: UserIndex, role_index: RoleIndex) -> PolicyResult<()> {
        let i = user_index.value() as usize;
        let decl = self
            .db
            .user_decls
            .get_mut(i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such user {user_index}")))?;
        decl.role_set.insert(role_index);
        Ok(())
    }

    pub fn intern_user(&mut self, name: &str) -> UserIndex {
        let (idx, was_new) = self.db.users.intern(name);
        if was_new {
            self.db.user_decls.push(UserDecl {
                name: name.to_string(),
                ..Default::default()
            });
        }
        idx
    }

    pub fn set_user_mls(
        &mut self,
        user_index: UserIndex,
        default_level: Option<umrs_selinux::MlsLevel>,
        range: Option<umrs_selinux::MlsRange>,
    ) -> PolicyResult<()> {
        let i = user_index.value() as usize;
        let decl = self
            .db
            .user_decls
            .get_mut(i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such user {user_index}")))?;
        decl.mls_default_level = default_level;
        decl.mls_range = range;
        if decl.mls_default_level.is_some() || decl.mls_range.is_some() {
            self.db.mls_enabled = true;
        }
        Ok(())
    }

    pub fn intern_perm(&mut self, name: &str) -> PermIndex {
        self.db.perms.intern(name).0
    }

    pub fn intern_common_perm(&mut self, name: &str) -> CommonPermIndex {
        let (idx, was_new) = self.db.common_perms.intern(name);
        if was_new {
            self.db.common_perm_decls.push(CommonPermission {
                name: name.to_string(),
                ..Default::default()
            });
        }
        idx
    }

    pub fn add_common_perm_member(&mut self, common: CommonPermIndex, perm: PermIndex) -> PolicyResult<()> {
        let i = common.value() as usize;
        let decl = self
            .db
            .common_perm_decls
            .get_mut(i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such common perm {common}")))?;
        decl.perms.insert(perm);
        Ok(())
    }

    pub fn intern_class(
        &mut self,
        name: &str,
        value: u32,
        common_perm: Option<CommonPermIndex>,
    ) -> ClassIndex {
        let (idx, was_new) = self.db.classes.intern(name);
        if was_new {
            self.db.class_decls.push(ObjectClass {
                name: name.to_string(),
                value,
                common_perm,
                unique_perms: BTreeSet::new(),
            });
        }
        idx
    }

    pub fn add_class_perm(&mut self, class: ClassIndex, perm: PermIndex) -> PolicyResult<()> {
        let i = class.value() as usize;
        let decl = self
            .db
            .class_decls
            .get_mut(i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such class {class}")))?;
        decl.unique_perms.insert(perm);
        Ok(())
    }

    pub fn intern_boolean(&mut self, name: &str) -> BoolIndex {
        let (idx, was_new) = self.db.booleans.intern(name);
        if was_new {
            self.db.bool_decls.push(false);
        }
        idx
    }

    /// Sets boolean `idx`'s declared default truth value, consulted by
    /// [`Self::build`] to resolve every conditional's governing branch
    /// (§4.E). Booleans default to `false` until set.
    pub fn set_boolean_default(&mut self, idx: BoolIndex, default: bool) -> PolicyResult<()> {
        let i = idx.value() as usize;
        let slot = self
            .db
            .bool_decls
            .get_mut(i)
            .ok_or_else(|| PolicyError::InvalidArgument(format!("no such boolean {idx}")))?;
        *slot = default;
        Ok(())
    }

    pub fn add_av_rule(&mut self, rule: AvRule) -> u32 {
        self.db.av_rules.push(rule);
        (self.db.av_rules.len() - 1) as u32
    }

    pub fn add_type_rule(&mut self, rule: TypeRule) -> u32 {
        self.db.type_rules.push(rule);
        (self.db.type_rules.len() - 1) as u32
    }

    pub fn add_role_allow(&mut self, rule: RoleAllowRule) {
        self.db.role_allows.push(rule);
    }

    pub fn add_role_transition(&mut self, rule: RoleTransitionRule) {
        self.db.role_transitions.push(rule);
    }

    pub fn add_range_transition(&mut self, rule: RangeTransitionRule) {
        self.db.mls_enabled = true;
        self.db.range_transitions.push(rule);
    }

    pub fn add_clone_rule(&mut self, rule: CloneRule) {
        self.db.clone_rules.push(rule);
    }

    pub fn add_conditional(&mut self, expr: ConditionalExpr) -> u32 {
        self.db.conditionals.push(expr);
        (self.db.conditionals.len() - 1) as u32
    }

    pub fn add_ocontext(&mut self, ocontext: Ocontext) {
        self.db.ocontexts.push(ocontext);
    }

    pub fn add_initial_sid(&mut self, sid: InitialSid) {
        self.db.initial_sids.push(sid);
    }

    pub fn set_validatetrans_present(&mut self, present: bool) {
        self.db.has_validatetrans = present;
    }

    /// Finalizes construction, returning the frozen, read-only database.
    /// No reference validation is re-run here — callers are expected to
    /// have resolved every name to an index as it was declared; the
    /// invariant (§4.B) is "any order is fine as long as references are
    /// resolved before finalization." Also resolves every conditional
    /// against the declared boolean defaults (§4.E), populating
    /// `inactive_av_rules`/`inactive_type_rules`.
    #[must_use]
    pub fn build(mut self) -> PolicyDb {
        self.resolve_conditionals();
        self.db
    }

    /// Evaluates each conditional's RPN expression against the declared
    /// boolean defaults, caches the result on the conditional
    /// (`current_value`), and marks every rule on the *other* branch (or,
    /// when the expression is `Undefined`, every rule on *both* branches)
    /// inactive. Grounded in the control-flow note in §2: "E is consulted
    /// when B contains conditional rules to decide which branch's rules
    /// are active."
    fn resolve_conditionals(&mut self) {
        let defaults = self.db.bool_decls.clone();
        let lookup = |idx: BoolIndex| -> Option<bool> { defaults.get(idx.value() as usize).copied() };

        for cond in &mut self.db.conditionals {
            cond.current_value = match crate::condeval::evaluate(&cond.rpn_nodes, &lookup) {
                crate::condeval::TriBool::True => Some(true),
                crate::condeval::TriBool::False => Some(false),
                crate::condeval::TriBool::Undefined => None,
            };
        }

        for cond in &self.db.conditionals {
            let mut mark_inactive = |rule: &GuardedRule| match rule {
                GuardedRule::Av(i) => {
                    self.db.inactive_av_rules.insert(*i);
                }
                GuardedRule::TypeRule(i) => {
                    self.db.inactive_type_rules.insert(*i);
                }
            };
            match cond.current_value {
                Some(true) => cond.false_rules.iter().for_each(&mut mark_inactive),
                Some(false) => cond.true_rules.iter().for_each(&mut mark_inactive),
                None => {
                    cond.true_rules.iter().for_each(&mut mark_inactive);
                    cond.false_rules.iter().for_each(&mut mark_inactive);
                }
            }
        }
    }
}
