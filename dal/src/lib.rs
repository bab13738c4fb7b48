use admin_dal::AdminDal;
use connection::holder::ConnectionHolder;
use leaf_dal::LeafDal;
use quota_dal::QuotaDal;
use sqlx::{pool::PoolConnection, Connection, PgConnection, Postgres, Transaction};
use subtree_dal::SubtreeDal;
use tlog_config::QuotaConfig;
use tlog_types::{StorageError, StorageResult};
use tree_head_dal::TreeHeadDal;

pub mod admin_dal;
pub mod cancel;
pub mod connection;
pub mod healthcheck;
pub mod leaf_dal;
pub mod log_transaction;
pub mod models;
pub mod quota_dal;
pub mod subtree_cache;
pub mod subtree_dal;
pub mod tree_head_dal;

pub use sqlx::Error as SqlxError;

/// Wraps a single backend connection — pooled, direct, or an open
/// transaction — and dispatches to per-domain DAL structs, mirroring the
/// teacher's `StorageProcessor`/DAL-accessor pattern.
#[derive(Debug)]
pub struct StorageProcessor<'a> {
    conn: ConnectionHolder<'a>,
    in_transaction: bool,
}

impl<'a> StorageProcessor<'a> {
    pub async fn establish_connection(db_url: &str) -> StorageResult<StorageProcessor<'static>> {
        let connection = PgConnection::connect(db_url).await?;
        Ok(StorageProcessor {
            conn: ConnectionHolder::Direct(connection),
            in_transaction: false,
        })
    }

    pub fn from_pool(conn: PoolConnection<Postgres>) -> Self {
        Self {
            conn: ConnectionHolder::Pooled(conn),
            in_transaction: false,
        }
    }

    pub fn from_transaction(conn: Transaction<'a, Postgres>) -> Self {
        Self {
            conn: ConnectionHolder::Transaction(conn),
            in_transaction: true,
        }
    }

    /// Opens a nested backend transaction over whatever connection this
    /// processor already holds (spec §4.4: "Opens a backend transaction").
    pub async fn start_transaction(&mut self) -> StorageResult<StorageProcessor<'_>> {
        let transaction = self.conn().begin().await?;
        Ok(StorageProcessor::from_transaction(transaction))
    }

    pub fn admin_dal(&mut self) -> AdminDal<'_, 'a> {
        AdminDal { storage: self }
    }

    pub fn leaf_dal(&mut self) -> LeafDal<'_, 'a> {
        LeafDal { storage: self }
    }

    pub fn subtree_dal(&mut self) -> SubtreeDal<'_, 'a> {
        SubtreeDal { storage: self }
    }

    pub fn tree_head_dal(&mut self) -> TreeHeadDal<'_, 'a> {
        TreeHeadDal { storage: self }
    }

    pub fn quota_dal(&mut self, config: QuotaConfig) -> QuotaDal<'_, 'a> {
        let use_select_count = config.use_select_count;
        QuotaDal {
            storage: self,
            config,
            use_select_count,
        }
    }

    fn conn(&mut self) -> &mut PgConnection {
        match &mut self.conn {
            ConnectionHolder::Pooled(conn) => conn,
            ConnectionHolder::Direct(conn) => conn,
            ConnectionHolder::Transaction(conn) => conn,
        }
    }

    /// Commits the held transaction. A safe no-op has no meaning here
    /// (unlike `log_transaction::LogTransaction::close`) — calling this on
    /// a non-transaction processor is a programming error, matching the
    /// teacher's own `commit`.
    pub async fn commit(self) -> StorageResult<()> {
        match self.conn {
            ConnectionHolder::Transaction(transaction) => {
                transaction.commit().await?;
                Ok(())
            }
            _ => Err(StorageError::internal(
                "StorageProcessor::commit called without an open transaction",
            )),
        }
    }

    pub fn is_in_transaction(&self) -> bool {
        self.in_transaction
    }
}
