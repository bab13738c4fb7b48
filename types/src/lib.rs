pub mod error;
pub mod hash;
pub mod leaf;
pub mod log_root;
pub mod node_id;
pub mod quota;
pub mod tree;

pub use error::{is_unique_violation, ErrorKind, StorageError, StorageResult};
pub use hash::{LeafIdentityHash, MerkleLeafHash, RootHash, HASH_LEN};
pub use leaf::{
    AddSequencedLeafResult, DequeuedLeaf, Leaf, LeafInput, QueuedLeafStatus, QueuedLogLeaf,
    SequencedLeaf, SequencedLeafOutcome,
};
pub use log_root::SignedLogRoot;
pub use node_id::NodeId;
pub use quota::{QuotaKind, QuotaScope, QuotaSpec};
pub use tree::{
    NewTree, StorageOptions, Tree, TreeControl, TreeId, TreeState, TreeType, TreeUpdate,
};
