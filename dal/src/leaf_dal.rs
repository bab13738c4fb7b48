use std::collections::HashMap;

use tlog_types::{
    is_unique_violation, DequeuedLeaf, Leaf, LeafIdentityHash, LeafInput, QueuedLeafStatus,
    QueuedLogLeaf, SequencedLeaf, StorageError, StorageResult, TreeId, TreeType,
};

use crate::models::leaf::{StorageLeaf, StorageQueuedLeaf};
use crate::StorageProcessor;

#[derive(Debug)]
pub struct LeafDal<'a, 'c> {
    pub(crate) storage: &'a mut StorageProcessor<'c>,
}

impl LeafDal<'_, '_> {
    /// Spec §4.2: sorts by `leaf_identity_hash` before inserting (a
    /// correctness requirement, not an optimization — it gives concurrent
    /// writers a total lock order and prevents deadlocks), treats a
    /// unique-violation on insert as "already exists" rather than a
    /// failure, and returns the canonical stored row for duplicates.
    #[tracing::instrument(name = "queue_leaves", skip_all)]
    pub async fn queue_leaves(
        &mut self,
        tree_id: TreeId,
        leaves: Vec<LeafInput>,
        queue_timestamp_nanos: i64,
    ) -> StorageResult<Vec<QueuedLogLeaf>> {
        let mut order: Vec<usize> = (0..leaves.len()).collect();
        order.sort_by(|&a, &b| {
            leaves[a]
                .leaf_identity_hash
                .as_bytes()
                .cmp(leaves[b].leaf_identity_hash.as_bytes())
        });

        let mut results: Vec<Option<QueuedLogLeaf>> = vec![None; leaves.len()];
        let mut duplicate_hashes: Vec<LeafIdentityHash> = Vec::new();

        for &idx in &order {
            let input = &leaves[idx];

            let insert = sqlx::query(
                "INSERT INTO leaf_data (
                    tree_id, leaf_identity_hash, merkle_leaf_hash, leaf_value, extra_data,
                    queue_timestamp_nanos, leaf_index, integrate_timestamp_nanos
                ) VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL)",
            )
            .bind(tree_id.get())
            .bind(input.leaf_identity_hash.as_bytes())
            .bind(input.merkle_leaf_hash.as_bytes())
            .bind(&input.leaf_value)
            .bind(&input.extra_data)
            .bind(queue_timestamp_nanos)
            .execute(self.storage.conn())
            .await;

            match insert {
                Ok(_) => {
                    sqlx::query(
                        "INSERT INTO unsequenced (
                            tree_id, bucket, queue_timestamp_nanos, leaf_identity_hash, merkle_leaf_hash
                        ) VALUES ($1, 0, $2, $3, $4)",
                    )
                    .bind(tree_id.get())
                    .bind(queue_timestamp_nanos)
                    .bind(input.leaf_identity_hash.as_bytes())
                    .bind(input.merkle_leaf_hash.as_bytes())
                    .execute(self.storage.conn())
                    .await?;

                    results[idx] = Some(QueuedLogLeaf {
                        leaf: Leaf {
                            tree_id,
                            leaf_identity_hash: input.leaf_identity_hash,
                            merkle_leaf_hash: input.merkle_leaf_hash,
                            leaf_value: input.leaf_value.clone(),
                            extra_data: input.extra_data.clone(),
                            queue_timestamp_nanos,
                            leaf_index: None,
                            integrate_timestamp_nanos: None,
                        },
                        status: QueuedLeafStatus::Queued,
                    });
                }
                Err(err) if is_unique_violation(&err) => {
                    duplicate_hashes.push(input.leaf_identity_hash);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if !duplicate_hashes.is_empty() {
            duplicate_hashes.sort_by_key(|h| *h.as_bytes());
            duplicate_hashes.dedup_by_key(|h| *h.as_bytes());

            let hash_bytes: Vec<&[u8]> =
                duplicate_hashes.iter().map(|h| h.as_bytes()).collect();
            let rows: Vec<StorageLeaf> = sqlx::query_as(
                "SELECT tree_id, leaf_identity_hash, merkle_leaf_hash, leaf_value, extra_data, \
                    queue_timestamp_nanos, leaf_index, integrate_timestamp_nanos \
                FROM leaf_data WHERE tree_id = $1 AND leaf_identity_hash = ANY($2)",
            )
            .bind(tree_id.get())
            .bind(&hash_bytes as &[&[u8]])
            .fetch_all(self.storage.conn())
            .await?;

            let mut canonical: HashMap<[u8; 32], Leaf> = HashMap::new();
            for row in rows {
                let leaf: Leaf = row.try_into()?;
                let key: [u8; 32] = leaf.leaf_identity_hash.as_bytes().try_into().unwrap();
                canonical.insert(key, leaf);
            }

            for &idx in &order {
                if results[idx].is_none() {
                    let hash: [u8; 32] = leaves[idx]
                        .leaf_identity_hash
                        .as_bytes()
                        .try_into()
                        .unwrap();
                    let leaf = canonical.get(&hash).cloned().ok_or_else(|| {
                        StorageError::internal("duplicate leaf vanished mid-transaction")
                    })?;
                    results[idx] = Some(QueuedLogLeaf {
                        leaf,
                        status: QueuedLeafStatus::AlreadyExists,
                    });
                }
            }
        }

        Ok(results.into_iter().map(|r| r.unwrap()).collect())
    }

    /// Only meaningful for `PREORDERED_LOG` (spec §4.2). A per-leaf
    /// savepoint guards each insert pair so one leaf's conflict doesn't
    /// abort its siblings — elided for single-leaf batches, since the
    /// whole transaction already aborts on any error in that case.
    #[tracing::instrument(name = "add_sequenced_leaves", skip_all)]
    pub async fn add_sequenced_leaves(
        &mut self,
        tree_id: TreeId,
        leaves: Vec<(LeafInput, i64)>,
        now_nanos: i64,
    ) -> StorageResult<Vec<tlog_types::AddSequencedLeafResult>> {
        use tlog_types::SequencedLeafOutcome;

        let use_savepoint = leaves.len() > 1;
        let mut results = Vec::with_capacity(leaves.len());

        for (idx, (input, leaf_index)) in leaves.into_iter().enumerate() {
            let savepoint = format!("add_seq_leaf_{idx}");
            if use_savepoint {
                sqlx::query(&format!("SAVEPOINT {savepoint}"))
                    .execute(self.storage.conn())
                    .await?;
            }

            let outcome = self
                .try_add_one_sequenced_leaf(tree_id, &input, leaf_index, now_nanos)
                .await;

            match outcome {
                Ok(()) => {
                    if use_savepoint {
                        sqlx::query(&format!("RELEASE SAVEPOINT {savepoint}"))
                            .execute(self.storage.conn())
                            .await?;
                    }
                    results.push(tlog_types::AddSequencedLeafResult {
                        leaf_index,
                        outcome: SequencedLeafOutcome::Ok,
                    });
                }
                Err(err) if is_unique_violation(&err) => {
                    if use_savepoint {
                        sqlx::query(&format!("ROLLBACK TO SAVEPOINT {savepoint}"))
                            .execute(self.storage.conn())
                            .await?;
                    } else {
                        return Err(StorageError::failed_precondition(format!(
                            "leaf_index {leaf_index} already sequenced: {err}"
                        )));
                    }
                    results.push(tlog_types::AddSequencedLeafResult {
                        leaf_index,
                        outcome: SequencedLeafOutcome::FailedPrecondition,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(results)
    }

    async fn try_add_one_sequenced_leaf(
        &mut self,
        tree_id: TreeId,
        input: &LeafInput,
        leaf_index: i64,
        now_nanos: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO leaf_data (
                tree_id, leaf_identity_hash, merkle_leaf_hash, leaf_value, extra_data,
                queue_timestamp_nanos, leaf_index, integrate_timestamp_nanos
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NULL)",
        )
        .bind(tree_id.get())
        .bind(input.leaf_identity_hash.as_bytes())
        .bind(input.merkle_leaf_hash.as_bytes())
        .bind(&input.leaf_value)
        .bind(&input.extra_data)
        .bind(now_nanos)
        .bind(leaf_index)
        .execute(self.storage.conn())
        .await?;

        sqlx::query(
            "INSERT INTO sequenced_leaf_data (
                tree_id, sequence_number, leaf_identity_hash, merkle_leaf_hash, integrate_timestamp_nanos
            ) VALUES ($1, $2, $3, $4, NULL)",
        )
        .bind(tree_id.get())
        .bind(leaf_index)
        .bind(input.leaf_identity_hash.as_bytes())
        .bind(input.merkle_leaf_hash.as_bytes())
        .execute(self.storage.conn())
        .await?;

        Ok(())
    }

    /// For `LOG`: selects and deletes up to `limit` queued entries with
    /// `queue_timestamp_nanos <= cutoff_nanos`, ordered by `(bucket,
    /// queue_timestamp_nanos, leaf_identity_hash)` — both to give the
    /// sequencer a deterministic scan order and, per spec §5, to defend
    /// against a misconfigured second sequencer racing on the same tree.
    /// For `PREORDERED_LOG`: a ranged scan from `tree_size` upward (those
    /// leaves are already index-assigned).
    #[tracing::instrument(name = "dequeue_leaves", skip(self))]
    pub async fn dequeue_leaves(
        &mut self,
        tree_id: TreeId,
        tree_type: TreeType,
        tree_size: i64,
        limit: i64,
        cutoff_nanos: i64,
    ) -> StorageResult<Vec<DequeuedLeaf>> {
        match tree_type {
            TreeType::Log => self.dequeue_log_leaves(tree_id, limit, cutoff_nanos).await,
            TreeType::PreorderedLog => {
                self.dequeue_preordered_leaves(tree_id, tree_size, limit)
                    .await
            }
        }
    }

    async fn dequeue_log_leaves(
        &mut self,
        tree_id: TreeId,
        limit: i64,
        cutoff_nanos: i64,
    ) -> StorageResult<Vec<DequeuedLeaf>> {
        let rows: Vec<StorageQueuedLeaf> = sqlx::query_as(
            "SELECT leaf_identity_hash, merkle_leaf_hash, queue_timestamp_nanos, bucket \
            FROM unsequenced \
            WHERE tree_id = $1 AND queue_timestamp_nanos <= $2 \
            ORDER BY bucket, queue_timestamp_nanos, leaf_identity_hash \
            LIMIT $3",
        )
        .bind(tree_id.get())
        .bind(cutoff_nanos)
        .bind(limit)
        .fetch_all(self.storage.conn())
        .await?;

        // A secondary in-transaction memo drops duplicates the SQL may
        // surface (spec §4.2) even though the primary key should already
        // prevent them; this is a second line of defense, not the only one.
        let mut memo: HashMap<Vec<u8>, ()> = HashMap::new();
        let mut leaves = Vec::with_capacity(rows.len());
        for row in rows {
            if memo.insert(row.leaf_identity_hash.clone(), ()).is_some() {
                continue;
            }
            sqlx::query(
                "DELETE FROM unsequenced WHERE tree_id = $1 AND bucket = $2 \
                AND queue_timestamp_nanos = $3 AND leaf_identity_hash = $4",
            )
            .bind(tree_id.get())
            .bind(row.bucket)
            .bind(row.queue_timestamp_nanos)
            .bind(&row.leaf_identity_hash)
            .execute(self.storage.conn())
            .await?;

            leaves.push(DequeuedLeaf {
                leaf_identity_hash: row.leaf_identity_hash.try_into()?,
                merkle_leaf_hash: row.merkle_leaf_hash.try_into()?,
                queue_timestamp_nanos: row.queue_timestamp_nanos,
            });
        }
        Ok(leaves)
    }

    async fn dequeue_preordered_leaves(
        &mut self,
        tree_id: TreeId,
        tree_size: i64,
        limit: i64,
    ) -> StorageResult<Vec<DequeuedLeaf>> {
        let rows: Vec<StorageLeaf> = sqlx::query_as(
            "SELECT tree_id, leaf_identity_hash, merkle_leaf_hash, leaf_value, extra_data, \
                queue_timestamp_nanos, leaf_index, integrate_timestamp_nanos \
            FROM leaf_data \
            WHERE tree_id = $1 AND leaf_index >= $2 \
            ORDER BY leaf_index \
            LIMIT $3",
        )
        .bind(tree_id.get())
        .bind(tree_size)
        .bind(limit)
        .fetch_all(self.storage.conn())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DequeuedLeaf {
                    leaf_identity_hash: row.leaf_identity_hash.try_into()?,
                    merkle_leaf_hash: row.merkle_leaf_hash.try_into()?,
                    queue_timestamp_nanos: row.queue_timestamp_nanos,
                })
            })
            .collect()
    }

    /// Conflicts here are fatal (spec §4.2): they indicate a sequencer bug,
    /// not a race the engine is expected to absorb.
    #[tracing::instrument(name = "update_sequenced_leaves", skip_all)]
    pub async fn update_sequenced_leaves(
        &mut self,
        tree_id: TreeId,
        leaves: &[SequencedLeaf],
    ) -> StorageResult<()> {
        for leaf in leaves {
            sqlx::query(
                "INSERT INTO sequenced_leaf_data (
                    tree_id, sequence_number, leaf_identity_hash, merkle_leaf_hash, integrate_timestamp_nanos
                )
                SELECT $1, $2, $3, merkle_leaf_hash, NULL FROM leaf_data
                WHERE tree_id = $1 AND leaf_identity_hash = $3",
            )
            .bind(tree_id.get())
            .bind(leaf.sequence_number)
            .bind(leaf.leaf_identity_hash.as_bytes())
            .execute(self.storage.conn())
            .await
            .map_err(|err| {
                StorageError::internal(format!(
                    "update_sequenced_leaves: sequencer bug inserting sequence_number {}: {err}",
                    leaf.sequence_number
                ))
            })?;
        }
        Ok(())
    }

    /// Validates `start >= 0`, `count > 0`, clips `count` to
    /// `tree_size - start`, and verifies the returned rows are densely
    /// numbered starting at `start` (spec §4.2): any gap below `tree_size`
    /// is an integrity error, not a partial result.
    #[tracing::instrument(name = "get_leaves_by_range", skip(self))]
    pub async fn get_leaves_by_range(
        &mut self,
        tree_id: TreeId,
        start: i64,
        count: i64,
        tree_size: i64,
    ) -> StorageResult<Vec<Leaf>> {
        if start < 0 {
            return Err(StorageError::invalid_argument("start must be >= 0"));
        }
        if count <= 0 {
            return Err(StorageError::invalid_argument("count must be > 0"));
        }
        if start >= tree_size {
            return Err(StorageError::invalid_argument(format!(
                "start {start} >= tree_size {tree_size}"
            )));
        }
        let count = count.min(tree_size - start);

        // `s.sequence_number` is reported as `leaf_index`, not `l.leaf_index`:
        // for `LOG` trees the latter is never set (the index only exists once
        // assigned by sequencing), while for `PREORDERED_LOG` the two always
        // agree by construction (`add_sequenced_leaves` writes both).
        let rows: Vec<StorageLeaf> = sqlx::query_as(
            "SELECT l.tree_id, l.leaf_identity_hash, l.merkle_leaf_hash, l.leaf_value, \
                l.extra_data, l.queue_timestamp_nanos, s.sequence_number AS leaf_index, \
                l.integrate_timestamp_nanos \
            FROM sequenced_leaf_data s \
            JOIN leaf_data l ON l.tree_id = s.tree_id AND l.leaf_identity_hash = s.leaf_identity_hash \
            WHERE s.tree_id = $1 AND s.sequence_number >= $2 AND s.sequence_number < $3 \
            ORDER BY s.sequence_number",
        )
        .bind(tree_id.get())
        .bind(start)
        .bind(start + count)
        .fetch_all(self.storage.conn())
        .await?;

        if rows.len() as i64 != count {
            return Err(StorageError::internal(format!(
                "dense-range check failed: expected {count} leaves from {start}, got {}",
                rows.len()
            )));
        }

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// A single `merkle_leaf_hash` may correspond to multiple sequenced
    /// entries (distinct `leaf_identity_hash`); all matches are returned.
    #[tracing::instrument(name = "get_leaves_by_hash", skip_all)]
    pub async fn get_leaves_by_hash(
        &mut self,
        tree_id: TreeId,
        hashes: &[tlog_types::MerkleLeafHash],
        order_by_sequence: bool,
    ) -> StorageResult<Vec<Leaf>> {
        let hash_bytes: Vec<&[u8]> = hashes.iter().map(|h| h.as_bytes()).collect();
        let query = if order_by_sequence {
            "SELECT l.tree_id, l.leaf_identity_hash, l.merkle_leaf_hash, l.leaf_value, \
                l.extra_data, l.queue_timestamp_nanos, \
                COALESCE(s.sequence_number, l.leaf_index) AS leaf_index, \
                l.integrate_timestamp_nanos \
            FROM leaf_data l \
            LEFT JOIN sequenced_leaf_data s \
                ON s.tree_id = l.tree_id AND s.leaf_identity_hash = l.leaf_identity_hash \
            WHERE l.tree_id = $1 AND l.merkle_leaf_hash = ANY($2) \
            ORDER BY s.sequence_number"
        } else {
            "SELECT tree_id, leaf_identity_hash, merkle_leaf_hash, leaf_value, extra_data, \
                queue_timestamp_nanos, leaf_index, integrate_timestamp_nanos \
            FROM leaf_data WHERE tree_id = $1 AND merkle_leaf_hash = ANY($2)"
        };

        let rows: Vec<StorageLeaf> = sqlx::query_as(query)
            .bind(tree_id.get())
            .bind(&hash_bytes as &[&[u8]])
            .fetch_all(self.storage.conn())
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
