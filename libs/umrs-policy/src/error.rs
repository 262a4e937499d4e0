// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Error taxonomy and message-sink plumbing (§7).
//!
//! `PolicyError` groups every failure the core can produce into the five
//! buckets §7 names. `Severity` + `MessageSink` carry the non-fatal
//! "semantic warning" bucket out of the core without ever writing to
//! stderr directly — callers that want the old "just print it" behavior
//! install a sink that does so themselves, matching the §9 design note
//! ("never a global stderr write from within the core").
// ===========================================================================

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Caller passed a null/out-of-range index, an empty required name, or
    /// a rule-kind/op mismatch. Reject locally; no partial state changes.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A name not present in the relevant symbol table. Inside the core
    /// this is always an error (adapters instead downgrade it to a
    /// warning and skip the enclosing declaration).
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// Grammar violation in a text input. Fatal for that input; no
    /// partial state survives.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Allocation failure. Aborts the in-progress operation; previously
    /// constructed state remains valid and consistent.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Severity of a non-fatal semantic-warning event (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A caller-installed callback receiving non-fatal diagnostics produced
/// during load or query. If no sink is installed, warnings/info are
/// suppressed and errors are printed to stderr (§7) — see
/// [`MessageSink::stderr_fallback`].
pub struct MessageSink {
    handler: Option<Box<dyn FnMut(Severity, &str) + Send>>,
}

impl MessageSink {
    /// A sink with no installed handler: warnings and info are dropped,
    /// errors print to standard error.
    #[must_use]
    pub fn stderr_fallback() -> Self {
        Self { handler: None }
    }

    pub fn with_handler<F>(handler: F) -> Self
    where
        F: FnMut(Severity, &str) + Send + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
        }
    }

    pub fn emit(&mut self, severity: Severity, message: &str) {
        match &mut self.handler {
            Some(handler) => handler(severity, message),
            None => {
                if severity == Severity::Error {
                    eprintln!("{severity}: {message}");
                }
            }
        }
    }
}

impl Default for MessageSink {
    fn default() -> Self {
        Self::stderr_fallback()
    }
}

impl fmt::Debug for MessageSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSink")
            .field("installed", &self.handler.is_some())
            .finish()
    }
}
