mod common;

use sqlx::PgPool;
use tlog_dal::StorageProcessor;
use tlog_types::{LeafIdentityHash, LeafInput, MerkleLeafHash, QueuedLeafStatus, TreeType};

fn leaf_input(identity: u8, merkle: u8, value: &[u8]) -> LeafInput {
    LeafInput {
        leaf_identity_hash: LeafIdentityHash::from(common::leaf_hash_from_byte(identity)),
        merkle_leaf_hash: MerkleLeafHash::from(common::leaf_hash_from_byte(merkle)),
        leaf_value: value.to_vec(),
        extra_data: Vec::new(),
        leaf_index: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn queuing_the_same_identity_hash_twice_is_deduplicated(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::Log).await;

    let first = storage
        .leaf_dal()
        .queue_leaves(tree.tree_id, vec![leaf_input(1, 1, b"hello")], 1000)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].status, QueuedLeafStatus::Queued);

    // Same leaf_identity_hash, different value: the stored copy should win.
    let second = storage
        .leaf_dal()
        .queue_leaves(tree.tree_id, vec![leaf_input(1, 1, b"goodbye")], 2000)
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].status, QueuedLeafStatus::AlreadyExists);
    assert_eq!(second[0].leaf.leaf_value, b"hello");
    assert_eq!(second[0].leaf.queue_timestamp_nanos, 1000);
}

#[sqlx::test(migrations = "./migrations")]
async fn queuing_a_mixed_batch_returns_one_result_per_input_in_order(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::Log).await;

    storage
        .leaf_dal()
        .queue_leaves(tree.tree_id, vec![leaf_input(5, 5, b"preexisting")], 500)
        .await
        .unwrap();

    let batch = vec![leaf_input(9, 9, b"new-a"), leaf_input(5, 5, b"ignored"), leaf_input(3, 3, b"new-b")];
    let results = storage
        .leaf_dal()
        .queue_leaves(tree.tree_id, batch, 1500)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].leaf.leaf_identity_hash.as_bytes()[0], 9);
    assert_eq!(results[0].status, QueuedLeafStatus::Queued);
    assert_eq!(results[1].leaf.leaf_identity_hash.as_bytes()[0], 5);
    assert_eq!(results[1].status, QueuedLeafStatus::AlreadyExists);
    assert_eq!(results[2].leaf.leaf_identity_hash.as_bytes()[0], 3);
    assert_eq!(results[2].status, QueuedLeafStatus::Queued);
}

#[sqlx::test(migrations = "./migrations")]
async fn dequeue_drains_in_timestamp_order_up_to_cutoff(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::Log).await;

    storage
        .leaf_dal()
        .queue_leaves(tree.tree_id, vec![leaf_input(1, 1, b"a")], 100)
        .await
        .unwrap();
    storage
        .leaf_dal()
        .queue_leaves(tree.tree_id, vec![leaf_input(2, 2, b"b")], 200)
        .await
        .unwrap();
    storage
        .leaf_dal()
        .queue_leaves(tree.tree_id, vec![leaf_input(3, 3, b"c")], 300)
        .await
        .unwrap();

    let dequeued = storage
        .leaf_dal()
        .dequeue_leaves(tree.tree_id, TreeType::Log, 0, 10, 250)
        .await
        .unwrap();

    assert_eq!(dequeued.len(), 2);
    assert_eq!(dequeued[0].queue_timestamp_nanos, 100);
    assert_eq!(dequeued[1].queue_timestamp_nanos, 200);

    // Dequeued entries are removed from the backlog.
    let remaining = storage
        .leaf_dal()
        .dequeue_leaves(tree.tree_id, TreeType::Log, 0, 10, 1000)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].queue_timestamp_nanos, 300);
}
