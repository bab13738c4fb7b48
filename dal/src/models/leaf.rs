use tlog_types::{Leaf, StorageError, TreeId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StorageLeaf {
    pub tree_id: i64,
    pub leaf_identity_hash: Vec<u8>,
    pub merkle_leaf_hash: Vec<u8>,
    pub leaf_value: Vec<u8>,
    pub extra_data: Vec<u8>,
    pub queue_timestamp_nanos: i64,
    pub leaf_index: Option<i64>,
    pub integrate_timestamp_nanos: Option<i64>,
}

impl TryFrom<StorageLeaf> for Leaf {
    type Error = StorageError;

    fn try_from(row: StorageLeaf) -> Result<Self, Self::Error> {
        Ok(Leaf {
            tree_id: TreeId(row.tree_id),
            leaf_identity_hash: row.leaf_identity_hash.try_into()?,
            merkle_leaf_hash: row.merkle_leaf_hash.try_into()?,
            leaf_value: row.leaf_value,
            extra_data: row.extra_data,
            queue_timestamp_nanos: row.queue_timestamp_nanos,
            leaf_index: row.leaf_index,
            integrate_timestamp_nanos: row.integrate_timestamp_nanos,
        })
    }
}

/// Row shape of one `Unsequenced` entry — a leaf awaiting sequencing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StorageQueuedLeaf {
    pub leaf_identity_hash: Vec<u8>,
    pub merkle_leaf_hash: Vec<u8>,
    pub queue_timestamp_nanos: i64,
    pub bucket: i32,
}
