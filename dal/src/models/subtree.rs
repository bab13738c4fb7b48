/// Row shape of one `Subtree` tile: the compact leaf-hash slice rooted at
/// `prefix`, at a given revision. Interior node hashes are never
/// persisted — only this file's `leaf_hashes` (bincode-encoded
/// `Vec<[u8; 32]>`), recomputed by the subtree cache on load (spec §4.3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StorageSubtreeTile {
    pub tree_id: i64,
    pub prefix: Vec<u8>,
    pub revision: i64,
    pub leaf_hashes: Vec<u8>,
}
