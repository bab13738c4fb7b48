use serde::{Deserialize, Serialize};

use crate::hash::RootHash;
use crate::tree::TreeId;

/// An append-only history entry: the signed commitment to a prefix of the
/// sequence at a given revision (spec §3). The signature itself is a
/// caller concern (spec §1 Non-goals); this struct carries only the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedLogRoot {
    pub tree_id: TreeId,
    pub revision: i64,
    pub tree_size: i64,
    pub root_hash: RootHash,
    pub timestamp_nanos: i64,
    pub signature: Vec<u8>,
}

impl SignedLogRoot {
    /// The root of a freshly-initialized, empty tree at revision 0.
    pub fn empty(tree_id: TreeId, timestamp_nanos: i64, empty_hash: RootHash) -> Self {
        Self {
            tree_id,
            revision: 0,
            tree_size: 0,
            root_hash: empty_hash,
            timestamp_nanos,
            signature: Vec::new(),
        }
    }
}
