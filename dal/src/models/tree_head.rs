use tlog_types::{SignedLogRoot, StorageError, TreeId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StorageTreeHead {
    pub tree_id: i64,
    pub revision: i64,
    pub tree_size: i64,
    pub root_hash: Vec<u8>,
    pub timestamp_nanos: i64,
    pub signature: Vec<u8>,
}

impl TryFrom<StorageTreeHead> for SignedLogRoot {
    type Error = StorageError;

    fn try_from(row: StorageTreeHead) -> Result<Self, Self::Error> {
        Ok(SignedLogRoot {
            tree_id: TreeId(row.tree_id),
            revision: row.revision,
            tree_size: row.tree_size,
            root_hash: row.root_hash.try_into()?,
            timestamp_nanos: row.timestamp_nanos,
            signature: row.signature,
        })
    }
}
