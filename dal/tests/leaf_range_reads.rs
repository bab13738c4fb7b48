mod common;

use sqlx::PgPool;
use tlog_dal::StorageProcessor;
use tlog_types::{ErrorKind, LeafIdentityHash, LeafInput, MerkleLeafHash, SequencedLeaf, TreeType};

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
async fn get_leaves_by_range_returns_a_dense_slice_in_sequence_order(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::Log).await;

    for b in 0..5u8 {
        storage
            .leaf_dal()
            .queue_leaves(tree.tree_id, vec![leaf_input(b)], 1_000 + b as i64)
            .await
            .unwrap();
    }
    let dequeued = storage
        .leaf_dal()
        .dequeue_leaves(tree.tree_id, TreeType::Log, 0, 10, 10_000)
        .await
        .unwrap();
    let sequenced: Vec<SequencedLeaf> = dequeued
        .iter()
        .enumerate()
        .map(|(i, d)| SequencedLeaf {
            leaf_identity_hash: d.leaf_identity_hash,
            sequence_number: i as i64,
        })
        .collect();
    storage
        .leaf_dal()
        .update_sequenced_leaves(tree.tree_id, &sequenced)
        .await
        .unwrap();

    let page = storage
        .leaf_dal()
        .get_leaves_by_range(tree.tree_id, 1, 2, 5)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].leaf_index, Some(1));
    assert_eq!(page[1].leaf_index, Some(2));
}

#[sqlx::test(migrations = "./migrations")]
async fn get_leaves_by_range_rejects_a_start_past_tree_size(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);
    let tree = common::create_tree(&mut storage, TreeType::Log).await;

    let err = storage
        .leaf_dal()
        .get_leaves_by_range(tree.tree_id, 5, 1, 5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
