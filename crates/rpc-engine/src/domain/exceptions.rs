//! Remote error classification.
//!
//! A static, ordered table maps remote error codes onto typed failures.
//! Lookups return the first matching rule; unmapped codes become
//! [`RpcError::UnknownRemote`] carrying the original code and message.

use crate::error::RpcError;

/// Remote error codes with a dedicated failure kind.
pub mod codes {
    /// Sign-in / token rejected by the remote.
    pub const AUTHENTICATION: i64 = -32000;
}

/// Typed failure a remote code maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Authentication,
}

impl ExceptionKind {
    fn into_error(self, message: &str) -> RpcError {
        match self {
            ExceptionKind::Authentication => RpcError::Authentication {
                message: message.to_owned(),
            },
        }
    }
}

/// One `{code, kind}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRule {
    pub code: i64,
    pub kind: ExceptionKind,
}

/// Rules every engine starts with.
pub const DEFAULT_RULES: &[ExceptionRule] = &[ExceptionRule {
    code: codes::AUTHENTICATION,
    kind: ExceptionKind::Authentication,
}];

/// Ordered classification table, fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionTable {
    rules: &'static [ExceptionRule],
}

impl ExceptionTable {
    pub fn new(rules: &'static [ExceptionRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [ExceptionRule] {
        self.rules
    }

    /// First kind registered for `code`, if any.
    pub fn lookup(&self, code: i64) -> Option<ExceptionKind> {
        self.rules
            .iter()
            .find(|rule| rule.code == code)
            .map(|rule| rule.kind)
    }

    /// Turn a remote `{code, message}` into the failure handed to the caller.
    pub fn classify(&self, code: i64, message: &str) -> RpcError {
        match self.lookup(code) {
            Some(kind) => kind.into_error(message),
            None => RpcError::UnknownRemote {
                code,
                message: message.to_owned(),
            },
        }
    }
}

impl Default for ExceptionTable {
    fn default() -> Self {
        Self::new(DEFAULT_RULES)
    }
}
