// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Conditional expression declarations (§3). Evaluation and equivalence
//! testing (component E) live in [`crate::condeval`]; this module only
//! holds the data shape stored in the policy database.
// ===========================================================================

use crate::ids::BoolIndex;

/// One reverse-Polish node: either an operator or a reference to a
/// declared boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondNode {
    Bool(BoolIndex),
    Not,
    Or,
    And,
    Xor,
    Eq,
    Neq,
}

/// A reference to a rule governed by a conditional's branch. Conditional
/// rules in practice are AV rules or type-transition-family rules; other
/// rule kinds are not conditionally guarded in the incumbent policy
/// language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedRule {
    Av(u32),
    TypeRule(u32),
}

#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub rpn_nodes: Vec<CondNode>,
    pub true_rules: Vec<GuardedRule>,
    pub false_rules: Vec<GuardedRule>,
    /// Last-evaluated truth value, cached so repeated queries against an
    /// unchanged set of boolean values don't re-run the RPN machine.
    pub current_value: Option<bool>,
}
