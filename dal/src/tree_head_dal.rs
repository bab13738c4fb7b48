use tlog_types::{SignedLogRoot, StorageError, StorageResult, TreeId};

use crate::models::tree_head::StorageTreeHead;
use crate::StorageProcessor;

/// A "tree needs init" sentinel (spec §4.4): surfaced when a tree has no
/// `tree_head` row yet. Callers run an initialization path in response
/// (`write_revision = 0`, `tree_size = 0`, empty root hash).
pub fn is_tree_needs_init(err: &StorageError) -> bool {
    err.kind() == tlog_types::ErrorKind::NotFound
}

#[derive(Debug)]
pub struct TreeHeadDal<'a, 'c> {
    pub(crate) storage: &'a mut StorageProcessor<'c>,
}

impl TreeHeadDal<'_, '_> {
    #[tracing::instrument(name = "latest_signed_log_root", skip_all)]
    pub async fn latest_signed_log_root(&mut self, tree_id: TreeId) -> StorageResult<SignedLogRoot> {
        let row: StorageTreeHead = sqlx::query_as(
            "SELECT tree_id, revision, tree_size, root_hash, timestamp_nanos, signature \
            FROM tree_head WHERE tree_id = $1 ORDER BY revision DESC LIMIT 1",
        )
        .bind(tree_id.get())
        .fetch_optional(self.storage.conn())
        .await?
        .ok_or_else(|| StorageError::not_found(format!("no tree_head for tree {}", tree_id.get())))?;
        row.try_into()
    }

    #[tracing::instrument(name = "signed_log_root_at_revision", skip_all)]
    pub async fn signed_log_root_at_revision(
        &mut self,
        tree_id: TreeId,
        revision: i64,
    ) -> StorageResult<SignedLogRoot> {
        let row: StorageTreeHead = sqlx::query_as(
            "SELECT tree_id, revision, tree_size, root_hash, timestamp_nanos, signature \
            FROM tree_head WHERE tree_id = $1 AND revision = $2",
        )
        .bind(tree_id.get())
        .bind(revision)
        .fetch_optional(self.storage.conn())
        .await?
        .ok_or_else(|| {
            StorageError::not_found(format!(
                "no tree_head for tree {} at revision {revision}",
                tree_id.get()
            ))
        })?;
        row.try_into()
    }

    /// Requires `new_root.tree_size >= current.tree_size`,
    /// `new_root.timestamp_nanos > current.timestamp_nanos`, and
    /// `new_root.revision == write_revision` (spec §4.4). Storing a root
    /// identical to the current one at the same revision is a no-op;
    /// storing a *different* root at an already-used revision is an
    /// integrity error.
    #[tracing::instrument(name = "store_signed_log_root", skip_all)]
    pub async fn store_signed_log_root(
        &mut self,
        new_root: &SignedLogRoot,
        write_revision: i64,
    ) -> StorageResult<()> {
        if new_root.revision != write_revision {
            return Err(StorageError::failed_precondition(format!(
                "root revision {} does not match write_revision {write_revision}",
                new_root.revision
            )));
        }

        let existing: Option<StorageTreeHead> = sqlx::query_as(
            "SELECT tree_id, revision, tree_size, root_hash, timestamp_nanos, signature \
            FROM tree_head WHERE tree_id = $1 AND revision = $2",
        )
        .bind(new_root.tree_id.get())
        .bind(new_root.revision)
        .fetch_optional(self.storage.conn())
        .await?;

        if let Some(existing) = existing {
            let existing: SignedLogRoot = existing.try_into()?;
            if existing == *new_root {
                return Ok(());
            }
            return Err(StorageError::internal(format!(
                "tree {} revision {} already stored with a different root",
                new_root.tree_id.get(),
                new_root.revision
            )));
        }

        if write_revision > 0 {
            let current = self.latest_signed_log_root(new_root.tree_id).await?;
            if new_root.tree_size < current.tree_size {
                return Err(StorageError::failed_precondition(
                    "tree_size must be monotone non-decreasing",
                ));
            }
            if new_root.timestamp_nanos <= current.timestamp_nanos {
                return Err(StorageError::failed_precondition(
                    "timestamp_nanos must strictly increase between roots",
                ));
            }
        }

        sqlx::query(
            "INSERT INTO tree_head (tree_id, revision, tree_size, root_hash, timestamp_nanos, signature) \
            VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(new_root.tree_id.get())
        .bind(new_root.revision)
        .bind(new_root.tree_size)
        .bind(new_root.root_hash.as_bytes())
        .bind(new_root.timestamp_nanos)
        .bind(&new_root.signature)
        .execute(self.storage.conn())
        .await?;

        Ok(())
    }
}
