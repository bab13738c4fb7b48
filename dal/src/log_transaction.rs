use tlog_types::{
    DequeuedLeaf, LeafInput, NodeId, QueuedLogLeaf, RootHash, SequencedLeaf, SignedLogRoot,
    StorageError, StorageResult, Tree, TreeId, TreeState,
};
use tlog_utils::rfc6962;
use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;
use crate::subtree_cache::SubtreeCache;
use crate::tree_head_dal::is_tree_needs_init;
use crate::StorageProcessor;

/// Bundles the admin/leaf/subtree/tree-head DALs into one read-write
/// transaction per log operation (spec §4.4). Opens its own backend
/// transaction on `open`, computes `read_revision`/`write_revision`, and
/// owns a fresh `SubtreeCache` for the transaction's lifetime.
pub struct LogTransaction<'c> {
    storage: StorageProcessor<'c>,
    tree: Tree,
    read_revision: i64,
    write_revision: i64,
    tree_size: i64,
    root_hash: RootHash,
    cache: SubtreeCache,
}

impl<'c> LogTransaction<'c> {
    /// Opens a backend transaction (spec §4.4). Every operation below races
    /// its backend round-trip against `cancel` (spec §5): on cancellation
    /// the surfaced error is generic, never a backend sentinel, and the
    /// enclosing backend transaction rolls back as usual when `self` is
    /// dropped without a prior `commit`.
    #[tracing::instrument(name = "log_transaction_open", skip(parent, cancel))]
    pub async fn open(
        parent: &'c mut StorageProcessor<'_>,
        tree_id: TreeId,
        cancel: &CancellationToken,
    ) -> StorageResult<Self> {
        run_cancellable(cancel, Self::open_inner(parent, tree_id)).await
    }

    async fn open_inner(parent: &'c mut StorageProcessor<'_>, tree_id: TreeId) -> StorageResult<Self> {
        let mut storage = parent.start_transaction().await?;
        let tree = storage.admin_dal().get_tree(tree_id).await?;
        if tree.deleted {
            return Err(StorageError::failed_precondition(format!(
                "tree {} is deleted",
                tree_id.get()
            )));
        }

        let latest = storage.tree_head_dal().latest_signed_log_root(tree_id).await;
        let (read_revision, tree_size, root_hash) = match latest {
            Ok(root) => (root.revision, root.tree_size, root.root_hash),
            Err(err) if is_tree_needs_init(&err) => {
                (-1, 0, RootHash::from(rfc6962::empty_root()))
            }
            Err(err) => return Err(err),
        };
        let write_revision = read_revision + 1;

        let storage_options = tree.storage_options_or_default();
        let cache = SubtreeCache::new(
            tree_id,
            read_revision,
            write_revision,
            storage_options.subtree_revisions_enabled,
        );

        Ok(Self {
            storage,
            tree,
            read_revision,
            write_revision,
            tree_size,
            root_hash,
            cache,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn read_revision(&self) -> i64 {
        self.read_revision
    }

    pub fn write_revision(&self) -> i64 {
        self.write_revision
    }

    pub fn tree_size(&self) -> i64 {
        self.tree_size
    }

    pub fn root_hash(&self) -> RootHash {
        self.root_hash
    }

    /// Rejects queuing against a frozen tree (spec §3 invariant: "once
    /// FROZEN, no leaves may be queued").
    pub async fn queue_leaves(
        &mut self,
        leaves: Vec<LeafInput>,
        queue_timestamp_nanos: i64,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<QueuedLogLeaf>> {
        if self.tree.tree_state == TreeState::Frozen {
            return Err(StorageError::failed_precondition(format!(
                "tree {} is frozen",
                self.tree.tree_id.get()
            )));
        }
        let tree_id = self.tree.tree_id;
        run_cancellable(
            cancel,
            self.storage
                .leaf_dal()
                .queue_leaves(tree_id, leaves, queue_timestamp_nanos),
        )
        .await
    }

    pub async fn dequeue_leaves(
        &mut self,
        limit: i64,
        cutoff_nanos: i64,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<DequeuedLeaf>> {
        let tree_id = self.tree.tree_id;
        let tree_type = self.tree.tree_type;
        let tree_size = self.tree_size;
        run_cancellable(
            cancel,
            self.storage
                .leaf_dal()
                .dequeue_leaves(tree_id, tree_type, tree_size, limit, cutoff_nanos),
        )
        .await
    }

    /// Persists sequence assignments and folds the newly-sequenced leaves'
    /// Merkle hashes into the subtree cache. `leaves` and
    /// `merkle_leaf_hashes` are paired by position (the Nth hash belongs to
    /// the Nth leaf) and are sorted together by `sequence_number` so tile
    /// boundaries line up with the pre-transaction `tree_size` regardless
    /// of the order the caller assembled them in.
    pub async fn update_sequenced_leaves(
        &mut self,
        leaves: Vec<SequencedLeaf>,
        merkle_leaf_hashes: &[[u8; 32]],
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        if leaves.len() != merkle_leaf_hashes.len() {
            return Err(StorageError::invalid_argument(
                "leaves and merkle_leaf_hashes must have the same length",
            ));
        }
        let mut paired: Vec<(SequencedLeaf, [u8; 32])> = leaves
            .into_iter()
            .zip(merkle_leaf_hashes.iter().copied())
            .collect();
        paired.sort_by_key(|(leaf, _)| leaf.sequence_number);
        let (leaves, merkle_leaf_hashes): (Vec<_>, Vec<_>) = paired.into_iter().unzip();

        let tree_id = self.tree.tree_id;
        run_cancellable(
            cancel,
            self.storage.leaf_dal().update_sequenced_leaves(tree_id, &leaves),
        )
        .await?;

        let tree_size = self.tree_size;
        run_cancellable(
            cancel,
            self.cache
                .append_leaves(&mut self.storage, tree_size, &merkle_leaf_hashes),
        )
        .await?;
        self.tree_size += merkle_leaf_hashes.len() as i64;
        Ok(())
    }

    /// `GetMerkleNodes` (spec §4.3/§4.4): node-id-addressed reads against
    /// the subtree cache, populated from the tiled node store on miss.
    pub async fn get_merkle_nodes(
        &mut self,
        node_ids: &[NodeId],
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<[u8; 32]>> {
        run_cancellable(
            cancel,
            self.cache.get_merkle_nodes(&mut self.storage, node_ids),
        )
        .await
    }

    /// `SetMerkleNodes` (spec §4.3/§4.4): node-id-addressed writes against
    /// the subtree cache; flushed to the tiled node store at `commit`.
    pub async fn set_merkle_nodes(
        &mut self,
        updates: &[(NodeId, [u8; 32])],
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        run_cancellable(cancel, self.cache.set_merkle_nodes(&mut self.storage, updates)).await
    }

    /// The RFC 6962 root over the current (in-transaction) `tree_size`.
    pub async fn compute_root_hash(&mut self, cancel: &CancellationToken) -> StorageResult<RootHash> {
        let tree_size = self.tree_size;
        let bytes = run_cancellable(cancel, self.cache.root_hash(&mut self.storage, tree_size)).await?;
        Ok(RootHash::from(bytes))
    }

    pub async fn store_signed_log_root(
        &mut self,
        root: &SignedLogRoot,
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        let write_revision = self.write_revision;
        run_cancellable(
            cancel,
            self.storage.tree_head_dal().store_signed_log_root(root, write_revision),
        )
        .await?;
        self.root_hash = root.root_hash;
        Ok(())
    }

    /// Flushes dirty subtree tiles, prunes old tile revisions per the
    /// tree's retention policy when configured, then commits the backend
    /// transaction (spec §4.4).
    pub async fn commit(mut self, cancel: &CancellationToken) -> StorageResult<()> {
        run_cancellable(cancel, self.cache.flush(&mut self.storage)).await?;

        let storage_options = self.tree.storage_options_or_default();
        if storage_options.subtree_revisions_enabled {
            if let Some(retain_count) = storage_options.subtree_retention {
                let tree_id = self.tree.tree_id;
                run_cancellable(
                    cancel,
                    self.storage
                        .subtree_dal()
                        .prune_old_subtree_revisions(tree_id, retain_count),
                )
                .await?;
            }
        }

        run_cancellable(cancel, self.storage.commit()).await?;
        Ok(())
    }

    /// Rolls back if not committed; a safe no-op after `commit` (spec
    /// §4.4). The backend transaction rolls back automatically when
    /// `storage` is dropped without a prior `commit`, so this only needs
    /// to exist to give callers an explicit, documented rollback point.
    pub fn close(self) {
        drop(self);
    }
}
