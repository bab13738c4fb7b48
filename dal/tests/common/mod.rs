use tlog_dal::StorageProcessor;
use tlog_types::{NewTree, Tree, TreeType};

pub async fn create_tree(storage: &mut StorageProcessor<'_>, tree_type: TreeType) -> Tree {
    storage
        .admin_dal()
        .create_tree(
            NewTree {
                tree_type,
                display_name: "test tree".to_string(),
                description: "created by an integration test".to_string(),
                max_root_duration_millis: 3_600_000,
                storage_options: None,
            },
            1_700_000_000_000,
        )
        .await
        .expect("create_tree should succeed")
}

pub fn leaf_hash_from_byte(b: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = b;
    bytes
}
