mod common;

use sqlx::PgPool;
use tlog_dal::StorageProcessor;
use tlog_types::{LeafIdentityHash, LeafInput, MerkleLeafHash, TreeType};

fn leaf_input(b: u8) -> LeafInput {
    LeafInput {
        leaf_identity_hash: LeafIdentityHash::from(common::leaf_hash_from_byte(b)),
        merkle_leaf_hash: MerkleLeafHash::from(common::leaf_hash_from_byte(b)),
        leaf_value: vec![b],
        extra_data: Vec::new(),
        leaf_index: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn add_sequenced_leaves_are_dequeued_in_index_order(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::PreorderedLog).await;

    // Deliberately out of index order; `add_sequenced_leaves` must not
    // care, and `dequeue_leaves` must still return them by `leaf_index`.
    let results = storage
        .leaf_dal()
        .add_sequenced_leaves(
            tree.tree_id,
            vec![
                (leaf_input(2), 2),
                (leaf_input(0), 0),
                (leaf_input(1), 1),
            ],
            1_000,
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
    for result in &results {
        assert_eq!(result.outcome, tlog_types::SequencedLeafOutcome::Ok);
    }

    let dequeued = storage
        .leaf_dal()
        .dequeue_leaves(tree.tree_id, TreeType::PreorderedLog, 0, 10, 10_000)
        .await
        .unwrap();
    let indices: Vec<u8> = dequeued.iter().map(|d| d.leaf_identity_hash.as_bytes()[0]).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[sqlx::test(migrations = "./migrations")]
async fn dequeue_preordered_leaves_only_returns_leaves_at_or_past_tree_size(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::PreorderedLog).await;

    storage
        .leaf_dal()
        .add_sequenced_leaves(
            tree.tree_id,
            vec![(leaf_input(0), 0), (leaf_input(1), 1), (leaf_input(2), 2)],
            1_000,
        )
        .await
        .unwrap();

    let dequeued = storage
        .leaf_dal()
        .dequeue_leaves(tree.tree_id, TreeType::PreorderedLog, 1, 10, 10_000)
        .await
        .unwrap();
    assert_eq!(dequeued.len(), 2);
    let indices: Vec<u8> = dequeued.iter().map(|d| d.leaf_identity_hash.as_bytes()[0]).collect();
    assert_eq!(indices, vec![1, 2]);
}

#[sqlx::test(migrations = "./migrations")]
async fn add_sequenced_leaves_rejects_reusing_a_leaf_index(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::PreorderedLog).await;

    storage
        .leaf_dal()
        .add_sequenced_leaves(tree.tree_id, vec![(leaf_input(0), 0)], 1_000)
        .await
        .unwrap();

    let err = storage
        .leaf_dal()
        .add_sequenced_leaves(tree.tree_id, vec![(leaf_input(9), 0)], 2_000)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), tlog_types::ErrorKind::FailedPrecondition);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_leaves_by_hash_orders_by_sequence_number_when_requested(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::PreorderedLog).await;

    storage
        .leaf_dal()
        .add_sequenced_leaves(
            tree.tree_id,
            vec![(leaf_input(2), 2), (leaf_input(0), 0), (leaf_input(1), 1)],
            1_000,
        )
        .await
        .unwrap();

    let hashes: Vec<MerkleLeafHash> = vec![
        MerkleLeafHash::from(common::leaf_hash_from_byte(2)),
        MerkleLeafHash::from(common::leaf_hash_from_byte(0)),
        MerkleLeafHash::from(common::leaf_hash_from_byte(1)),
    ];
    let leaves = storage
        .leaf_dal()
        .get_leaves_by_hash(tree.tree_id, &hashes, true)
        .await
        .unwrap();

    let indices: Vec<i64> = leaves.iter().map(|l| l.leaf_index.unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}
