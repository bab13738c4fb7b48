mod common;

use assert_matches::assert_matches;
use sqlx::PgPool;
use tlog_dal::StorageProcessor;
use tlog_types::{ErrorKind, TreeState, TreeType, TreeUpdate};

#[sqlx::test(migrations = "./migrations")]
async fn create_then_get_tree_round_trips(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);

    let created = common::create_tree(&mut storage, TreeType::Log).await;
    let fetched = storage
        .admin_dal()
        .get_tree(created.tree_id)
        .await
        .expect("get_tree should find the freshly created tree");

    assert_eq!(fetched.tree_id, created.tree_id);
    assert_eq!(fetched.tree_type, TreeType::Log);
    assert_eq!(fetched.tree_state, TreeState::Active);
    assert!(!fetched.deleted);
    assert!(fetched.tree_control.signing_enabled);
    assert!(fetched.tree_control.sequencing_enabled);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_tree_on_unknown_id_is_not_found(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);

    let err = storage
        .admin_dal()
        .get_tree(tlog_types::TreeId(42))
        .await
        .unwrap_err();
    assert_matches!(err.kind(), ErrorKind::NotFound);
}

#[sqlx::test(migrations = "./migrations")]
async fn soft_delete_then_undelete_round_trips(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);

    let tree = common::create_tree(&mut storage, TreeType::Log).await;
    storage
        .admin_dal()
        .soft_delete_tree(tree.tree_id, 1_700_000_001_000)
        .await
        .unwrap();

    let deleted = storage.admin_dal().get_tree(tree.tree_id).await.unwrap();
    assert!(deleted.deleted);

    // Queuing against a deleted tree is rejected at the admin layer via
    // `update_tree`'s deleted check, and separately at `LogTransaction::open`.
    let err = storage
        .admin_dal()
        .update_tree(
            tree.tree_id,
            TreeUpdate {
                tree_state: Some(TreeState::Frozen),
                ..Default::default()
            },
            1_700_000_002_000,
        )
        .await
        .unwrap_err();
    assert_matches!(err.kind(), ErrorKind::FailedPrecondition);

    storage.admin_dal().undelete_tree(tree.tree_id).await.unwrap();
    let undeleted = storage.admin_dal().get_tree(tree.tree_id).await.unwrap();
    assert!(!undeleted.deleted);
}

#[sqlx::test(migrations = "./migrations")]
async fn hard_delete_requires_prior_soft_delete(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);

    let tree = common::create_tree(&mut storage, TreeType::Log).await;
    let err = storage.admin_dal().hard_delete_tree(tree.tree_id).await.unwrap_err();
    assert_matches!(err.kind(), ErrorKind::FailedPrecondition);

    storage
        .admin_dal()
        .soft_delete_tree(tree.tree_id, 1_700_000_001_000)
        .await
        .unwrap();
    storage.admin_dal().hard_delete_tree(tree.tree_id).await.unwrap();

    let err = storage.admin_dal().get_tree(tree.tree_id).await.unwrap_err();
    assert_matches!(err.kind(), ErrorKind::NotFound);
}

#[sqlx::test(migrations = "./migrations")]
async fn list_trees_excludes_deleted_by_default(pool: PgPool) {
    let conn = pool.acquire().await.unwrap();
    let mut storage = StorageProcessor::from_pool(conn);

    let a = common::create_tree(&mut storage, TreeType::Log).await;
    let b = common::create_tree(&mut storage, TreeType::Log).await;
    storage
        .admin_dal()
        .soft_delete_tree(b.tree_id, 1_700_000_001_000)
        .await
        .unwrap();

    let visible = storage.admin_dal().list_trees(false).await.unwrap();
    assert!(visible.iter().any(|t| t.tree_id == a.tree_id));
    assert!(!visible.iter().any(|t| t.tree_id == b.tree_id));

    let all = storage.admin_dal().list_trees(true).await.unwrap();
    assert!(all.iter().any(|t| t.tree_id == b.tree_id));
}
