use serde::{Deserialize, Serialize};

use crate::hash::{LeafIdentityHash, MerkleLeafHash};
use crate::tree::TreeId;

/// A leaf as submitted by a caller, before `queue_timestamp` is stamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafInput {
    pub leaf_identity_hash: LeafIdentityHash,
    pub merkle_leaf_hash: MerkleLeafHash,
    pub leaf_value: Vec<u8>,
    pub extra_data: Vec<u8>,
    /// Only meaningful for `PREORDERED_LOG`, ignored for `LOG`.
    pub leaf_index: Option<i64>,
}

/// A leaf as stored: identity, value, and the bookkeeping timestamps that
/// track its progress through queued → sequenced → integrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub tree_id: TreeId,
    pub leaf_identity_hash: LeafIdentityHash,
    pub merkle_leaf_hash: MerkleLeafHash,
    pub leaf_value: Vec<u8>,
    pub extra_data: Vec<u8>,
    pub queue_timestamp_nanos: i64,
    pub leaf_index: Option<i64>,
    pub integrate_timestamp_nanos: Option<i64>,
}

/// The outcome of queuing a single leaf: either it was newly queued, or it
/// already existed and the canonical stored copy is returned instead
/// (spec §4.2 step 6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueuedLeafStatus {
    Queued,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedLogLeaf {
    pub leaf: Leaf,
    pub status: QueuedLeafStatus,
}

/// The outcome of attempting to add one pre-sequenced leaf via
/// `AddSequencedLeaves` (spec §4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequencedLeafOutcome {
    Ok,
    FailedPrecondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddSequencedLeafResult {
    pub leaf_index: i64,
    pub outcome: SequencedLeafOutcome,
}

/// A leaf dequeued from the unsequenced backlog, ready to be assigned a
/// `sequence_number` by the caller (the sequencer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DequeuedLeaf {
    pub leaf_identity_hash: LeafIdentityHash,
    pub merkle_leaf_hash: MerkleLeafHash,
    pub queue_timestamp_nanos: i64,
}

/// A leaf paired with the sequence number the sequencer assigned it,
/// ready for `UpdateSequencedLeaves`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedLeaf {
    pub leaf_identity_hash: LeafIdentityHash,
    pub sequence_number: i64,
}
