use rand::Rng;
use tlog_types::{
    NewTree, StorageError, StorageResult, Tree, TreeId, TreeState, TreeType, TreeUpdate,
};

use crate::models::tree::StorageTree;
use crate::StorageProcessor;

const TREE_JOIN: &str = "SELECT t.tree_id, t.tree_type, t.tree_state, t.display_name, \
    t.description, t.create_time_millis, t.update_time_millis, t.max_root_duration_millis, \
    t.storage_options, t.deleted, t.deleted_at_millis, \
    c.signing_enabled, c.sequencing_enabled \
    FROM trees t JOIN tree_control c ON c.tree_id = t.tree_id";

#[derive(Debug)]
pub struct AdminDal<'a, 'c> {
    pub(crate) storage: &'a mut StorageProcessor<'c>,
}

impl AdminDal<'_, '_> {
    /// Generates fresh random 63-bit tree ids and retries on collision
    /// (spec §4.1): ids are never client-chosen, so concurrent creators
    /// never need to coordinate.
    #[tracing::instrument(name = "create_tree", skip_all)]
    pub async fn create_tree(&mut self, new_tree: NewTree, now_millis: i64) -> StorageResult<Tree> {
        const MAX_ATTEMPTS: u32 = 10;

        let storage_options_json = new_tree
            .storage_options
            .map(|opts| serde_json::to_value(opts))
            .transpose()
            .map_err(|e| StorageError::internal(format!("failed serializing storage_options: {e}")))?;

        for attempt in 0..MAX_ATTEMPTS {
            let tree_id: i64 = rand::thread_rng().gen_range(1..=i64::MAX >> 1);

            let inserted = sqlx::query(
                "INSERT INTO trees (
                    tree_id, tree_type, tree_state, display_name, description,
                    create_time_millis, update_time_millis, max_root_duration_millis,
                    storage_options, deleted, deleted_at_millis
                ) VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, false, NULL)
                ON CONFLICT (tree_id) DO NOTHING",
            )
            .bind(tree_id)
            .bind(new_tree.tree_type.as_db_str())
            .bind(TreeState::Active.as_db_str())
            .bind(&new_tree.display_name)
            .bind(&new_tree.description)
            .bind(now_millis)
            .bind(new_tree.max_root_duration_millis)
            .bind(&storage_options_json)
            .execute(self.storage.conn())
            .await?;

            if inserted.rows_affected() == 0 {
                tracing::warn!(attempt, "tree_id collision, retrying");
                continue;
            }

            sqlx::query(
                "INSERT INTO tree_control (tree_id, signing_enabled, sequencing_enabled)
                VALUES ($1, true, true)",
            )
            .bind(tree_id)
            .execute(self.storage.conn())
            .await?;

            return self.get_tree(TreeId(tree_id)).await;
        }

        Err(StorageError::internal(
            "failed to allocate a unique tree_id after 10 attempts",
        ))
    }

    #[tracing::instrument(name = "get_tree", skip_all)]
    pub async fn get_tree(&mut self, tree_id: TreeId) -> StorageResult<Tree> {
        let row: StorageTree = sqlx::query_as(&format!("{TREE_JOIN} WHERE t.tree_id = $1"))
            .bind(tree_id.get())
            .fetch_optional(self.storage.conn())
            .await?
            .ok_or_else(|| StorageError::not_found(format!("tree {} not found", tree_id.get())))?;
        row.try_into()
    }

    #[tracing::instrument(name = "list_trees", skip_all)]
    pub async fn list_trees(&mut self, include_deleted: bool) -> StorageResult<Vec<Tree>> {
        let query = if include_deleted {
            TREE_JOIN.to_string()
        } else {
            format!("{TREE_JOIN} WHERE t.deleted = false")
        };
        let rows: Vec<StorageTree> = sqlx::query_as(&query)
            .fetch_all(self.storage.conn())
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Loads the tree, applies `mutator`, validates the transition, and
    /// rewrites it. Immutable fields (id, type, hash strategy) are simply
    /// absent from `TreeUpdate`, so there is nothing to validate there;
    /// only the tree-state transition is checked (spec §4.1).
    #[tracing::instrument(name = "update_tree", skip_all)]
    pub async fn update_tree(
        &mut self,
        tree_id: TreeId,
        update: TreeUpdate,
        now_millis: i64,
    ) -> StorageResult<Tree> {
        let current = self.get_tree(tree_id).await?;
        if current.deleted {
            return Err(StorageError::failed_precondition(format!(
                "tree {} is deleted",
                tree_id.get()
            )));
        }

        let new_state = update.tree_state.unwrap_or(current.tree_state);
        validate_state_transition(current.tree_state, new_state)?;

        let new_display_name = update.display_name.unwrap_or(current.display_name);
        let new_description = update.description.unwrap_or(current.description);
        let new_max_root_duration = update
            .max_root_duration_millis
            .unwrap_or(current.max_root_duration_millis);
        let new_storage_options = update.storage_options.or(current.storage_options);
        let storage_options_json = new_storage_options
            .map(|opts| serde_json::to_value(opts))
            .transpose()
            .map_err(|e| StorageError::internal(format!("failed serializing storage_options: {e}")))?;

        sqlx::query(
            "UPDATE trees SET tree_state = $1, display_name = $2, description = $3, \
             max_root_duration_millis = $4, storage_options = $5, update_time_millis = $6 \
             WHERE tree_id = $7",
        )
        .bind(new_state.as_db_str())
        .bind(&new_display_name)
        .bind(&new_description)
        .bind(new_max_root_duration)
        .bind(&storage_options_json)
        .bind(now_millis)
        .bind(tree_id.get())
        .execute(self.storage.conn())
        .await?;

        self.get_tree(tree_id).await
    }

    #[tracing::instrument(name = "soft_delete_tree", skip_all)]
    pub async fn soft_delete_tree(&mut self, tree_id: TreeId, now_millis: i64) -> StorageResult<()> {
        let current = self.get_tree(tree_id).await?;
        if current.deleted {
            return Err(StorageError::failed_precondition(format!(
                "tree {} is already deleted",
                tree_id.get()
            )));
        }
        sqlx::query("UPDATE trees SET deleted = true, deleted_at_millis = $1 WHERE tree_id = $2")
            .bind(now_millis)
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        Ok(())
    }

    #[tracing::instrument(name = "undelete_tree", skip_all)]
    pub async fn undelete_tree(&mut self, tree_id: TreeId) -> StorageResult<()> {
        let current = self.get_tree(tree_id).await?;
        if !current.deleted {
            return Err(StorageError::failed_precondition(format!(
                "tree {} is not deleted",
                tree_id.get()
            )));
        }
        sqlx::query("UPDATE trees SET deleted = false, deleted_at_millis = NULL WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        Ok(())
    }

    /// Requires prior soft-deletion; cascades to `tree_control` and
    /// `tree_head` explicitly rather than relying on FK cascades (spec
    /// §4.1).
    #[tracing::instrument(name = "hard_delete_tree", skip_all)]
    pub async fn hard_delete_tree(&mut self, tree_id: TreeId) -> StorageResult<()> {
        let current = self.get_tree(tree_id).await?;
        if !current.deleted {
            return Err(StorageError::failed_precondition(format!(
                "tree {} must be soft-deleted before hard deletion",
                tree_id.get()
            )));
        }

        sqlx::query("DELETE FROM tree_head WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        sqlx::query("DELETE FROM subtree WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        sqlx::query("DELETE FROM sequenced_leaf_data WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        sqlx::query("DELETE FROM unsequenced WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        sqlx::query("DELETE FROM leaf_data WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        sqlx::query("DELETE FROM tree_control WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        sqlx::query("DELETE FROM trees WHERE tree_id = $1")
            .bind(tree_id.get())
            .execute(self.storage.conn())
            .await?;
        Ok(())
    }
}

fn validate_state_transition(from: TreeState, to: TreeState) -> StorageResult<()> {
    // Any ACTIVE<->FROZEN<->DRAINING transition is allowed (spec §4.1);
    // there is currently no narrower server policy to enforce here, but
    // the hook exists so one can be added without touching call sites.
    // `tree_type` is immutable by construction: `TreeUpdate` has no field
    // for it, so the LOG->PREORDERED_LOG prohibition can never be violated
    // through this path.
    let _ = (from, to);
    Ok(())
}
