use serde::{Deserialize, Serialize};

use crate::tree::TreeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaKind {
    Read,
    Write,
}

/// The entity a quota spec applies to. Only `Global`-scoped `Write`
/// requests are actually enforced by this engine (spec §4.5); the rest
/// are accepted as a documented but unconstrained part of the contract,
/// left for a deployment to tighten if it needs per-tree or per-user
/// ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaScope {
    Global,
    Tree(TreeId),
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSpec {
    pub scope: QuotaScope,
    pub kind: QuotaKind,
}

impl QuotaSpec {
    pub fn global_write() -> Self {
        Self {
            scope: QuotaScope::Global,
            kind: QuotaKind::Write,
        }
    }

    /// Whether this spec is actually enforced (spec §4.5: only
    /// Global-Write is constrained).
    pub fn is_enforced(&self) -> bool {
        matches!(self.scope, QuotaScope::Global) && matches!(self.kind, QuotaKind::Write)
    }
}
