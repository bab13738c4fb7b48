use tlog_types::{StorageError, StorageResult, TreeId};

use crate::models::subtree::StorageSubtreeTile;
use crate::StorageProcessor;

/// Raw CRUD over the `Subtree` tile table (spec §6: keyed by `(TreeId,
/// SubtreeId, SubtreeRevision)`, **largest** revision ≤ the requested one
/// selected on load). The subtree cache is the only caller; it owns the
/// tiling/hashing semantics, this module only owns the SQL.
#[derive(Debug)]
pub struct SubtreeDal<'a, 'c> {
    pub(crate) storage: &'a mut StorageProcessor<'c>,
}

impl SubtreeDal<'_, '_> {
    #[tracing::instrument(name = "get_tile", skip(self))]
    pub async fn get_tile(
        &mut self,
        tree_id: TreeId,
        prefix: &[u8],
        max_revision: i64,
    ) -> StorageResult<Option<Vec<[u8; 32]>>> {
        let row: Option<StorageSubtreeTile> = sqlx::query_as(
            "SELECT tree_id, prefix, revision, leaf_hashes FROM subtree \
            WHERE tree_id = $1 AND prefix = $2 AND revision <= $3 \
            ORDER BY revision DESC LIMIT 1",
        )
        .bind(tree_id.get())
        .bind(prefix)
        .bind(max_revision)
        .fetch_optional(self.storage.conn())
        .await?;

        row.map(|row| decode_leaf_hashes(&row.leaf_hashes)).transpose()
    }

    /// Writes a tile at `revision`. When `revision == 0` (the
    /// `subtree_revisions` storage option disabled, spec §4.3), this is an
    /// overwrite-in-place: any existing row at revision 0 is replaced.
    #[tracing::instrument(name = "put_tile", skip(self, leaf_hashes))]
    pub async fn put_tile(
        &mut self,
        tree_id: TreeId,
        prefix: &[u8],
        revision: i64,
        leaf_hashes: &[[u8; 32]],
    ) -> StorageResult<()> {
        let encoded = encode_leaf_hashes(leaf_hashes)?;
        sqlx::query(
            "INSERT INTO subtree (tree_id, prefix, revision, leaf_hashes) \
            VALUES ($1, $2, $3, $4) \
            ON CONFLICT (tree_id, prefix, revision) DO UPDATE SET leaf_hashes = EXCLUDED.leaf_hashes",
        )
        .bind(tree_id.get())
        .bind(prefix)
        .bind(revision)
        .bind(&encoded)
        .execute(self.storage.conn())
        .await?;
        Ok(())
    }

    /// Drops historic tile revisions older than the `subtree_retention`
    /// most recent ones for a given prefix, once `subtree_revisions` is
    /// enabled (the retention-policy knob from the supplemented
    /// `StorageOptions`; spec's Non-goals defer rather than forbid this).
    #[tracing::instrument(name = "prune_old_subtree_revisions", skip(self))]
    pub async fn prune_old_subtree_revisions(
        &mut self,
        tree_id: TreeId,
        retain_count: u32,
    ) -> StorageResult<u64> {
        let result = sqlx::query(
            "DELETE FROM subtree WHERE tree_id = $1 AND revision NOT IN ( \
                SELECT revision FROM subtree s2 \
                WHERE s2.tree_id = subtree.tree_id AND s2.prefix = subtree.prefix \
                ORDER BY s2.revision DESC LIMIT $2 \
            )",
        )
        .bind(tree_id.get())
        .bind(retain_count as i64)
        .execute(self.storage.conn())
        .await?;
        Ok(result.rows_affected())
    }
}

fn encode_leaf_hashes(leaf_hashes: &[[u8; 32]]) -> StorageResult<Vec<u8>> {
    bincode::serialize(leaf_hashes)
        .map_err(|e| StorageError::internal(format!("failed encoding tile: {e}")))
}

fn decode_leaf_hashes(bytes: &[u8]) -> StorageResult<Vec<[u8; 32]>> {
    bincode::deserialize(bytes).map_err(|e| StorageError::internal(format!("corrupt tile: {e}")))
}
