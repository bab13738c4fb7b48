use tlog_config::QuotaConfig;
use tlog_types::{QuotaSpec, StorageError, StorageResult, TreeId};
use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;
use crate::StorageProcessor;

/// Admission control for write tokens (spec §4.5). Only `Global`/`Write`
/// specs are actually enforced; `PutTokens`/`ResetQuota`/`PeekTokens` are
/// no-ops beyond a successful return — this is a rate ceiling, not a
/// token reservoir.
#[derive(Debug)]
pub struct QuotaDal<'a, 'c> {
    pub(crate) storage: &'a mut StorageProcessor<'c>,
    pub(crate) config: QuotaConfig,
    pub(crate) use_select_count: bool,
}

impl QuotaDal<'_, '_> {
    /// Admits `n` write tokens against every spec in `specs`. Only
    /// `Global`-`Write` specs are checked; everything else is accepted
    /// unconditionally (documented as unconstrained in spec §4.5).
    #[tracing::instrument(name = "get_tokens", skip(self, specs, cancel))]
    pub async fn get_tokens(
        &mut self,
        n: u64,
        specs: &[QuotaSpec],
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        if !specs.iter().any(QuotaSpec::is_enforced) {
            return Ok(());
        }

        let backlog = run_cancellable(cancel, self.unsequenced_backlog(None)).await?;
        if backlog + n > self.config.max_unsequenced_rows {
            return Err(StorageError::resource_exhausted(format!(
                "too-many-unsequenced-rows: backlog {backlog} + {n} > ceiling {}",
                self.config.max_unsequenced_rows
            )));
        }
        Ok(())
    }

    pub async fn put_tokens(&mut self, _n: u64, _specs: &[QuotaSpec]) -> StorageResult<()> {
        Ok(())
    }

    pub async fn reset_quota(&mut self, _specs: &[QuotaSpec]) -> StorageResult<()> {
        Ok(())
    }

    pub async fn peek_tokens(&mut self, _specs: &[QuotaSpec]) -> StorageResult<()> {
        Ok(())
    }

    /// `SELECT COUNT(*)` (accurate, expensive) when `use_select_count` is
    /// set; otherwise a constant-time but lagging estimate from
    /// `pg_stat_user_tables`.
    async fn unsequenced_backlog(&mut self, tree_id: Option<TreeId>) -> StorageResult<u64> {
        if self.use_select_count {
            let count: i64 = if let Some(tree_id) = tree_id {
                sqlx::query_scalar("SELECT COUNT(*) FROM unsequenced WHERE tree_id = $1")
                    .bind(tree_id.get())
                    .fetch_one(self.storage.conn())
                    .await?
            } else {
                sqlx::query_scalar("SELECT COUNT(*) FROM unsequenced")
                    .fetch_one(self.storage.conn())
                    .await?
            };
            Ok(count.max(0) as u64)
        } else {
            let estimate: Option<i64> = sqlx::query_scalar(
                "SELECT n_live_tup FROM pg_stat_user_tables WHERE relname = 'unsequenced'",
            )
            .fetch_optional(self.storage.conn())
            .await?;
            Ok(estimate.unwrap_or(0).max(0) as u64)
        }
    }
}
