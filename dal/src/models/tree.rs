use tlog_types::{StorageError, StorageOptions, Tree, TreeControl, TreeId, TreeState, TreeType};

/// Row shape of a `Trees` ⋈ `TreeControl` join — the two tables are kept
/// separate on disk (slow-changing identity vs. operationally-mutable
/// flags, see `tlog_types::tree::TreeControl`) but always read together.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StorageTree {
    pub tree_id: i64,
    pub tree_type: String,
    pub tree_state: String,
    pub display_name: String,
    pub description: String,
    pub create_time_millis: i64,
    pub update_time_millis: i64,
    pub max_root_duration_millis: i64,
    pub storage_options: Option<serde_json::Value>,
    pub deleted: bool,
    pub deleted_at_millis: Option<i64>,
    pub signing_enabled: bool,
    pub sequencing_enabled: bool,
}

impl TryFrom<StorageTree> for Tree {
    type Error = StorageError;

    fn try_from(row: StorageTree) -> Result<Self, Self::Error> {
        let tree_type = TreeType::from_db_str(&row.tree_type).ok_or_else(|| {
            StorageError::internal(format!("unrecognized tree_type {:?}", row.tree_type))
        })?;
        let tree_state = TreeState::from_db_str(&row.tree_state).ok_or_else(|| {
            StorageError::internal(format!("unrecognized tree_state {:?}", row.tree_state))
        })?;
        let storage_options = row
            .storage_options
            .map(|value| serde_json::from_value::<StorageOptions>(value))
            .transpose()
            .map_err(|e| StorageError::internal(format!("corrupt storage_options: {e}")))?;

        Ok(Tree {
            tree_id: TreeId(row.tree_id),
            tree_type,
            tree_state,
            display_name: row.display_name,
            description: row.description,
            create_time_millis: row.create_time_millis,
            update_time_millis: row.update_time_millis,
            max_root_duration_millis: row.max_root_duration_millis,
            storage_options,
            deleted: row.deleted,
            deleted_at_millis: row.deleted_at_millis,
            tree_control: TreeControl {
                signing_enabled: row.signing_enabled,
                sequencing_enabled: row.sequencing_enabled,
            },
        })
    }
}
